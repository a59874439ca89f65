//! BER-style Tag-Length-Value tree for ICC data.
//!
//! Parse is a recursive descent over a byte buffer producing a flat pool of
//! nodes; parent and child relations are indices into that pool, never
//! owning references. The tree structure is a parse/build-time convenience:
//! the wire format only ever contains flat tag-length-value byte runs, and a
//! constructed node's value is the concatenation of its children's
//! serialized forms.
//!
//! Tag rule: one byte, unless the low five bits of the first byte are all
//! set (`0x1F`), in which case the tag continues through every byte with the
//! high bit set, ending at (and including) the first byte with it clear.
//! Length rule: a first length byte below 128 is the length itself; otherwise
//! its low seven bits count the big-endian length bytes that follow, at most
//! four.

use crate::error::CodecError;

/// Index of a node in a [`TlvTree`] pool.
pub type NodeId = usize;

const TAG_CONTINUES: u8 = 0x1F;
const TAG_CONSTRUCTED: u8 = 0x20;
const MAX_LENGTH_BYTES: usize = 4;

#[derive(Debug, Clone)]
pub struct TlvNode {
    tag: Vec<u8>,
    value: Vec<u8>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl TlvNode {
    /// A primitive node from an uppercase/lowercase hex tag and raw value.
    pub fn primitive(tag: &str, value: &[u8]) -> Result<Self, CodecError> {
        Ok(TlvNode {
            tag: crate::bytes::hex_to_bytes(tag)?,
            value: value.to_vec(),
            parent: None,
            children: Vec::new(),
        })
    }

    /// A primitive node with a hex-encoded value.
    pub fn primitive_hex(tag: &str, value_hex: &str) -> Result<Self, CodecError> {
        Ok(TlvNode {
            tag: crate::bytes::hex_to_bytes(tag)?,
            value: crate::bytes::hex_to_bytes(value_hex)?,
            parent: None,
            children: Vec::new(),
        })
    }

    /// A constructed node with no children yet. The tag must carry the
    /// constructed bit.
    pub fn constructed(tag: &str) -> Result<Self, CodecError> {
        let tag = crate::bytes::hex_to_bytes(tag)?;
        if tag.first().map(|b| b & TAG_CONSTRUCTED == 0).unwrap_or(true) {
            return Err(CodecError::MalformedInput(format!(
                "tag {} is not constructed",
                hex::encode_upper(&tag)
            )));
        }
        Ok(TlvNode {
            tag,
            value: Vec::new(),
            parent: None,
            children: Vec::new(),
        })
    }

    pub fn tag(&self) -> &[u8] {
        &self.tag
    }

    pub fn tag_hex(&self) -> String {
        hex::encode_upper(&self.tag)
    }

    pub fn value(&self) -> &[u8] {
        &self.value
    }

    pub fn value_hex(&self) -> String {
        hex::encode_upper(&self.value)
    }

    /// Value length in bytes. Derived for constructed nodes, never
    /// independently settable.
    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    pub fn is_constructed(&self) -> bool {
        self.tag.first().map(|b| b & TAG_CONSTRUCTED != 0).unwrap_or(false)
    }

    pub fn parent(&self) -> Option<NodeId> {
        self.parent
    }

    pub fn children(&self) -> &[NodeId] {
        &self.children
    }

    /// Length bytes chosen by magnitude: below 128 a single verbatim byte,
    /// 128..=255 `81 nn`, 256 and above `82 nn nn` big-endian.
    pub fn length_bytes(&self) -> Vec<u8> {
        let len = self.value.len();
        if len < 128 {
            vec![len as u8]
        } else if len < 256 {
            vec![0x81, len as u8]
        } else {
            vec![0x82, (len / 256) as u8, (len % 256) as u8]
        }
    }

    /// Serialize this node: tag, length encoding, value.
    pub fn to_bytes(&self) -> Vec<u8> {
        let length = self.length_bytes();
        let mut out = Vec::with_capacity(self.tag.len() + length.len() + self.value.len());
        out.extend_from_slice(&self.tag);
        out.extend_from_slice(&length);
        out.extend_from_slice(&self.value);
        out
    }

    pub fn to_hex(&self) -> String {
        hex::encode_upper(self.to_bytes())
    }
}

/// Flat pool of TLV nodes with parent/child index links.
#[derive(Debug, Clone, Default)]
pub struct TlvTree {
    nodes: Vec<TlvNode>,
    known_tags: Option<Vec<String>>,
}

impl TlvTree {
    pub fn new() -> Self {
        TlvTree::default()
    }

    /// Parse a buffer of sibling TLV elements, recursing into constructed
    /// values. Nodes land in the pool in pre-order.
    pub fn parse(buf: &[u8]) -> Result<Self, CodecError> {
        let mut tree = TlvTree::new();
        let mut offset = 0;
        while offset < buf.len() {
            offset += tree.parse_element(buf, offset, None)?;
        }
        Ok(tree)
    }

    /// Parse one element at `offset`; returns the bytes it consumed.
    fn parse_element(
        &mut self,
        buf: &[u8],
        offset: usize,
        parent: Option<NodeId>,
    ) -> Result<usize, CodecError> {
        let remaining = buf.len() - offset;
        let first = buf[offset];

        let mut tag_size = 1;
        if first & TAG_CONTINUES == TAG_CONTINUES {
            loop {
                let idx = offset + tag_size;
                if idx >= buf.len() {
                    return Err(CodecError::truncated("TLV tag", tag_size + 1, remaining));
                }
                tag_size += 1;
                if buf[idx] & 0x80 == 0 {
                    break;
                }
            }
        }
        let tag = buf[offset..offset + tag_size].to_vec();

        if offset + tag_size >= buf.len() {
            return Err(CodecError::truncated("TLV length", tag_size + 1, remaining));
        }
        let len_first = buf[offset + tag_size];
        let (len_size, value_len) = if len_first < 0x80 {
            (1, len_first as usize)
        } else {
            let n = (len_first & 0x7F) as usize;
            if n > MAX_LENGTH_BYTES {
                return Err(CodecError::LengthOverflow(n));
            }
            let len_start = offset + tag_size + 1;
            if len_start + n > buf.len() {
                return Err(CodecError::truncated("TLV length", tag_size + 1 + n, remaining));
            }
            let mut value_len = 0usize;
            for &b in &buf[len_start..len_start + n] {
                value_len = (value_len << 8) | b as usize;
            }
            (1 + n, value_len)
        };

        let value_start = offset + tag_size + len_size;
        if value_start + value_len > buf.len() {
            return Err(CodecError::truncated(
                format!("TLV value for tag {}", hex::encode_upper(&tag)),
                value_len,
                buf.len() - value_start,
            ));
        }
        let value = buf[value_start..value_start + value_len].to_vec();
        let constructed = first & TAG_CONSTRUCTED != 0;

        let id = self.nodes.len();
        self.nodes.push(TlvNode {
            tag,
            value,
            parent,
            children: Vec::new(),
        });
        if let Some(p) = parent {
            self.nodes[p].children.push(id);
        }

        if constructed {
            let mut inner = 0;
            while inner < value_len {
                inner += self.parse_element(&buf[..value_start + value_len], value_start + inner, Some(id))?;
            }
        }

        Ok(tag_size + len_size + value_len)
    }

    /// Append a detached node to the pool.
    pub fn add_node(&mut self, node: TlvNode) -> NodeId {
        self.nodes.push(node);
        self.nodes.len() - 1
    }

    /// Register `child` under `parent` and recompute the parent's derived
    /// fields: its value grows by the child's serialized bytes, which also
    /// re-derives its length encoding.
    pub fn add_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), CodecError> {
        let count = self.nodes.len();
        if parent >= count || child >= count {
            return Err(CodecError::IndexError {
                position: parent.max(child),
                count,
            });
        }
        if !self.nodes[parent].is_constructed() {
            return Err(CodecError::MalformedInput(format!(
                "tag {} is not constructed",
                self.nodes[parent].tag_hex()
            )));
        }
        let child_bytes = self.nodes[child].to_bytes();
        self.nodes[child].parent = Some(parent);
        let node = &mut self.nodes[parent];
        node.children.push(child);
        node.value.extend_from_slice(&child_bytes);
        Ok(())
    }

    /// Serialize every root node back into one flat buffer.
    pub fn build(&self) -> Vec<u8> {
        let mut out = Vec::new();
        for node in self.nodes.iter().filter(|n| n.parent.is_none()) {
            out.extend_from_slice(&node.to_bytes());
        }
        out
    }

    /// Number of nodes in the pool (all levels).
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn node(&self, id: NodeId) -> Option<&TlvNode> {
        self.nodes.get(id)
    }

    /// First node with the given hex tag, searching the whole pool. ICC
    /// consumers look for a tag anywhere in the structure, not per level.
    pub fn first_with_tag(&self, tag: &str) -> Option<&TlvNode> {
        self.nodes
            .iter()
            .find(|n| n.tag_hex().eq_ignore_ascii_case(tag))
    }

    pub fn all_with_tag(&self, tag: &str) -> Vec<&TlvNode> {
        self.nodes
            .iter()
            .filter(|n| n.tag_hex().eq_ignore_ascii_case(tag))
            .collect()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &TlvNode> {
        self.nodes.iter()
    }

    /// Restrict [`is_tag_known`](Self::is_tag_known) to an allow-list.
    /// Unknown tags are still parsed and kept.
    pub fn set_known_tags(&mut self, tags: Vec<String>) {
        self.known_tags = Some(tags);
    }

    /// Without an allow-list every tag is known.
    pub fn is_tag_known(&self, tag: &str) -> bool {
        match &self.known_tags {
            None => true,
            Some(tags) => tags.iter().any(|t| t.eq_ignore_ascii_case(tag)),
        }
    }
}
