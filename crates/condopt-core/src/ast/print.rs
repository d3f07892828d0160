use crate::{
    ast::{ExprArena, NodeId, NodeKind},
    error::{ErrorClass, ErrorOrigin, InternalError},
};
use std::fmt::Write;

/// Deepest subtree [`ExprArena::print`] renders before giving up.
pub const MAX_PRINT_DEPTH: usize = 256;

impl ExprArena {
    /// Render `id` in query syntax.
    ///
    /// Printing is fallible: trees deeper than [`MAX_PRINT_DEPTH`] and
    /// dangling variable handles are errors rather than partial output.
    pub fn print(&self, id: NodeId) -> Result<String, InternalError> {
        let mut out = String::new();
        self.print_into(id, 0, &mut out)?;

        Ok(out)
    }

    fn print_into(&self, id: NodeId, depth: usize, out: &mut String) -> Result<(), InternalError> {
        if depth > MAX_PRINT_DEPTH {
            return Err(InternalError::new(
                ErrorClass::Internal,
                ErrorOrigin::Condition,
                format!("expression deeper than {MAX_PRINT_DEPTH} levels"),
            ));
        }
        let members = self.members(id);
        let next = depth + 1;

        match self.kind(id) {
            NodeKind::Constant(value) => push(out, format_args!("{value}")),
            NodeKind::Array => {
                out.push('[');
                self.print_list(members, ", ", next, out)?;
                out.push(']');
            }
            NodeKind::Reference(var) => {
                let variable = self.variable(*var).ok_or_else(|| {
                    InternalError::not_found(ErrorOrigin::Condition, "variable", var)
                })?;
                out.push_str(&variable.name);
            }
            NodeKind::AttributeAccess(name) => {
                self.print_into(members[0], next, out)?;
                out.push('.');
                out.push_str(name);
            }
            NodeKind::Expansion => {
                self.print_into(members[0], next, out)?;
                out.push_str("[*]");
            }
            NodeKind::Compare { op, quantifier } => {
                self.print_into(members[0], next, out)?;
                match quantifier {
                    Some(q) => push(out, format_args!(" {q} {op} ")),
                    None => push(out, format_args!(" {op} ")),
                }
                self.print_into(members[1], next, out)?;
            }
            NodeKind::Not => {
                out.push_str("!(");
                self.print_into(members[0], next, out)?;
                out.push(')');
            }
            kind @ (NodeKind::And | NodeKind::NaryAnd | NodeKind::Or | NodeKind::NaryOr) => {
                let (separator, empty) = if kind.is_and() {
                    (" && ", "true")
                } else {
                    (" || ", "false")
                };
                if members.is_empty() {
                    out.push_str(empty);
                } else {
                    out.push('(');
                    self.print_list(members, separator, next, out)?;
                    out.push(')');
                }
            }
            NodeKind::Function(name) => {
                out.push_str(name);
                out.push('(');
                self.print_list(members, ", ", next, out)?;
                out.push(')');
            }
            NodeKind::Nop => {}
        }

        Ok(())
    }

    fn print_list(
        &self,
        members: &[NodeId],
        separator: &str,
        depth: usize,
        out: &mut String,
    ) -> Result<(), InternalError> {
        for (i, member) in members.iter().enumerate() {
            if i > 0 {
                out.push_str(separator);
            }
            self.print_into(*member, depth, out)?;
        }

        Ok(())
    }
}

fn push(out: &mut String, args: std::fmt::Arguments<'_>) {
    // Writing to a String cannot fail.
    let _ = out.write_fmt(args);
}
