use crate::{
    ast::{ExprArena, NodeId, NodeKind, Quantifier},
    condition::Condition,
};
use sha2::{Digest, Sha256};

impl Condition {
    /// SHA-256 over the condition's structure.
    ///
    /// Variables contribute their names, constants their canonical keys, so
    /// equal conditions built in different arenas fingerprint identically.
    #[must_use]
    pub fn fingerprint(&self, arena: &ExprArena) -> [u8; 32] {
        let mut hasher = Sha256::new();
        match self.root {
            Some(root) => hash_node(&mut hasher, arena, root),
            None => write_tag(&mut hasher, 0x30),
        }

        hasher.finalize().into()
    }
}

fn hash_node(hasher: &mut Sha256, arena: &ExprArena, id: NodeId) {
    match arena.kind(id) {
        NodeKind::Constant(value) => {
            write_tag(hasher, 0x31);
            write_bytes(hasher, &value.canonical_key());
        }
        NodeKind::Array => write_tag(hasher, 0x32),
        NodeKind::Reference(var) => {
            write_tag(hasher, 0x33);
            let name = arena.variable(*var).map_or("", |v| v.name.as_str());
            write_bytes(hasher, name.as_bytes());
        }
        NodeKind::AttributeAccess(name) => {
            write_tag(hasher, 0x34);
            write_bytes(hasher, name.as_bytes());
        }
        NodeKind::Expansion => write_tag(hasher, 0x35),
        NodeKind::Compare { op, quantifier } => {
            write_tag(hasher, 0x36);
            write_tag(hasher, op.tag());
            write_tag(hasher, quantifier_tag(*quantifier));
        }
        NodeKind::Not => write_tag(hasher, 0x37),
        NodeKind::And => write_tag(hasher, 0x38),
        NodeKind::Or => write_tag(hasher, 0x39),
        NodeKind::NaryAnd => write_tag(hasher, 0x3a),
        NodeKind::NaryOr => write_tag(hasher, 0x3b),
        NodeKind::Function(name) => {
            write_tag(hasher, 0x3c);
            write_bytes(hasher, name.as_bytes());
        }
        NodeKind::Nop => write_tag(hasher, 0x3d),
    }

    let members = arena.members(id);
    write_len_u32(hasher, members.len());
    for member in members {
        hash_node(hasher, arena, *member);
    }
}

const fn quantifier_tag(quantifier: Option<Quantifier>) -> u8 {
    match quantifier {
        None => 0x00,
        Some(Quantifier::All) => 0x01,
        Some(Quantifier::Any) => 0x02,
        Some(Quantifier::None) => 0x03,
    }
}

fn write_bytes(hasher: &mut Sha256, bytes: &[u8]) {
    write_len_u32(hasher, bytes.len());
    hasher.update(bytes);
}

// Platform-sized length as u32 with deterministic saturation.
fn write_len_u32(hasher: &mut Sha256, len: usize) {
    let len = u32::try_from(len).unwrap_or(u32::MAX);
    hasher.update(len.to_be_bytes());
}

fn write_tag(hasher: &mut Sha256, tag: u8) {
    hasher.update([tag]);
}
