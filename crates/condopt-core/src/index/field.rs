use crate::{
    ast::{CompareOp, ExprArena, NodeId, VariableId},
    condition::{AttributeSide, ConditionPart},
    index::{FilterCosts, Index, SortCondition, SortCosts, StreamOptions},
    path::AttributePath,
    value::Value,
};

// Heuristics of the built-in cost model. Each equality field divides the
// estimate by the fan-in; a range multiplies it by its selectivity.
const EQUALITY_FAN_IN: f64 = 10.0;
const HALF_RANGE_SELECTIVITY: f64 = 0.5;
const BOUNDED_RANGE_SELECTIVITY: f64 = 0.25;

///
/// FieldIndex
///
/// Index described by its field list and flags, answering the oracle with a
/// deterministic heuristic: an equality prefix (IN fans out), then at most
/// one range field.
///

#[derive(Clone, Debug)]
pub struct FieldIndex {
    id: u64,
    name: String,
    fields: Vec<AttributePath>,
    sorted: bool,
    sparse: bool,
    unique: bool,
}

impl FieldIndex {
    /// Sorted, non-sparse, non-unique index over `fields`.
    #[must_use]
    pub fn new(id: u64, name: impl Into<String>, fields: Vec<AttributePath>) -> Self {
        Self {
            id,
            name: name.into(),
            fields,
            sorted: true,
            sparse: false,
            unique: false,
        }
    }

    #[must_use]
    pub const fn with_sorted(mut self, sorted: bool) -> Self {
        self.sorted = sorted;
        self
    }

    #[must_use]
    pub const fn with_sparse(mut self, sparse: bool) -> Self {
        self.sparse = sparse;
        self
    }

    #[must_use]
    pub const fn with_unique(mut self, unique: bool) -> Self {
        self.unique = unique;
        self
    }

    fn analyze(&self, arena: &ExprArena, branch: NodeId, variable: VariableId) -> FieldMatch {
        let parts = arena
            .members(branch)
            .iter()
            .filter_map(|m| ConditionPart::for_variable(arena, *m, variable))
            .filter(|p| p.op.is_some() && p.quantifier.is_none())
            .filter(|p| !arena.references_variable(p.value_node, variable))
            .collect::<Vec<_>>();

        let mut found = FieldMatch::default();
        for field in &self.fields {
            let name = field.to_string();
            let on_field = parts
                .iter()
                .filter(|p| p.attribute_name == name)
                .collect::<Vec<_>>();

            if let Some(eq) = on_field.iter().find(|p| p.op == Some(CompareOp::Eq)) {
                found.used.push(eq.operator_node);
                found.equality_fields += 1;
                continue;
            }

            if let Some((part, list)) = on_field.iter().find_map(|p| {
                (p.side == AttributeSide::Left)
                    .then(|| p.in_list(arena))
                    .flatten()
                    .map(|list| (p, list))
            }) {
                found.used.push(part.operator_node);
                found.equality_fields += 1;
                found.fan_out = found.fan_out.saturating_mul(list.len().max(1));
                continue;
            }

            let lower = on_field
                .iter()
                .filter(|p| matches!(p.op, Some(CompareOp::Gt | CompareOp::Ge)))
                .collect::<Vec<_>>();
            let upper = on_field
                .iter()
                .filter(|p| matches!(p.op, Some(CompareOp::Lt | CompareOp::Le)))
                .collect::<Vec<_>>();
            if !lower.is_empty() || !upper.is_empty() {
                found
                    .used
                    .extend(lower.iter().chain(&upper).map(|p| p.operator_node));
                found.range = Some((!lower.is_empty(), !upper.is_empty()));
            }
            break;
        }

        found.excludes_nulls = self.fields.iter().all(|field| {
            let name = field.to_string();
            parts
                .iter()
                .filter(|p| p.attribute_name == name)
                .any(|p| excludes_null(arena, p))
        });

        found
    }
}

#[derive(Debug)]
struct FieldMatch {
    used: Vec<NodeId>,
    equality_fields: usize,
    fan_out: usize,
    range: Option<(bool, bool)>,
    excludes_nulls: bool,
}

impl Default for FieldMatch {
    fn default() -> Self {
        Self {
            used: Vec::new(),
            equality_fields: 0,
            fan_out: 1,
            range: None,
            excludes_nulls: false,
        }
    }
}

impl Index for FieldIndex {
    fn id(&self) -> u64 {
        self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn is_sorted(&self) -> bool {
        self.sorted
    }

    fn sparse(&self) -> bool {
        self.sparse
    }

    fn unique(&self) -> bool {
        self.unique
    }

    fn fields(&self) -> &[AttributePath] {
        &self.fields
    }

    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    fn supports_filter_condition(
        &self,
        arena: &ExprArena,
        branch: NodeId,
        variable: VariableId,
        items_in_collection: usize,
    ) -> FilterCosts {
        let found = self.analyze(arena, branch, variable);
        let full_equality = found.equality_fields == self.fields.len() && found.range.is_none();

        if found.used.is_empty()
            || (!self.sorted && !full_equality)
            || (self.sparse && !found.excludes_nulls)
        {
            return FilterCosts::unsupported(items_in_collection);
        }

        let items = items_in_collection as f64;
        let estimated_items = if self.unique && full_equality {
            found.fan_out.min(items_in_collection)
        } else {
            let equalities = i32::try_from(found.equality_fields).unwrap_or(i32::MAX);
            let mut estimate = items / EQUALITY_FAN_IN.powi(equalities);
            estimate *= match found.range {
                Some((true, true)) => BOUNDED_RANGE_SELECTIVITY,
                Some(_) => HALF_RANGE_SELECTIVITY,
                None => 1.0,
            };
            estimate *= found.fan_out as f64;

            (estimate.ceil() as usize).clamp(items_in_collection.min(1), items_in_collection)
        };
        let estimated_costs = estimated_items as f64 + found.fan_out as f64 * (items + 1.0).log2();

        FilterCosts {
            supported: true,
            estimated_items,
            estimated_costs,
        }
    }

    fn specialize_condition(
        &self,
        arena: &ExprArena,
        branch: NodeId,
        variable: VariableId,
    ) -> Vec<NodeId> {
        let used = self.analyze(arena, branch, variable).used;

        arena
            .members(branch)
            .iter()
            .copied()
            .filter(|m| used.contains(m))
            .collect()
    }

    fn supports_sort_condition(&self, sort: &SortCondition, _items_in_collection: usize) -> SortCosts {
        let supported = self.sorted
            && !sort.fields.is_empty()
            && sort.is_unidirectional()
            && sort.fields.len() <= self.fields.len()
            && sort
                .fields
                .iter()
                .zip(&self.fields)
                .all(|((path, _), field)| path == field && !field.has_expansion());

        SortCosts {
            supported,
            estimated_costs: if supported { 0.0 } else { f64::INFINITY },
        }
    }

    // One key position, every position before it pinned by a constant, and
    // projections inside the field list.
    fn supports_stream_interface(&self, options: &StreamOptions) -> bool {
        if !self.sorted || self.has_expansion() {
            return false;
        }
        let [key] = options.used_key_fields.as_slice() else {
            return false;
        };

        *key < self.fields.len()
            && options.constant_fields.iter().copied().eq(0..*key)
            && options
                .projected_fields
                .iter()
                .all(|field| *field < self.fields.len())
    }
}

fn excludes_null(arena: &ExprArena, part: &ConditionPart) -> bool {
    let value = part.constant_value(arena);
    let non_null = |v: &Option<Value>| v.as_ref().is_some_and(|v| !v.is_null());

    match part.op {
        Some(CompareOp::Eq | CompareOp::Ge) => non_null(&value),
        Some(CompareOp::Gt) => value.is_some(),
        Some(CompareOp::Ne) => value.as_ref().is_some_and(Value::is_null),
        Some(CompareOp::In) => part
            .in_list(arena)
            .is_some_and(|list| !list.is_empty() && list.iter().all(|v| !v.is_null())),
        _ => false,
    }
}
