//! Post-invocation commit ordering.
//!
//! Bound parameters commit in ascending [`StepOrder`]; parameters sharing an
//! order keep their declaration order. Enqueue-style bindings declare
//! [`StepOrder::ENQUEUE`] and therefore commit after every default binding.

use std::cmp::Ordering;

use spindle_types::StepOrder;

/// Compares two bound entries by `(step order, original position)`.
pub fn compare_step_order(left: (StepOrder, usize), right: (StepOrder, usize)) -> Ordering {
    left.0.cmp(&right.0).then(left.1.cmp(&right.1))
}

/// Returns parameter indexes in commit order, ties kept in declaration order.
pub fn commit_order(orders: &[StepOrder]) -> Vec<usize> {
    let keys: Vec<(StepOrder, usize)> = orders.iter().copied().zip(0..).collect();
    commit_sequence(&keys)
}

/// Returns indexes into `keys` sorted by `(step order, original position)`.
///
/// The original position is the provider's place in the request mapping,
/// which need not match the parameter index.
pub fn commit_sequence(keys: &[(StepOrder, usize)]) -> Vec<usize> {
    let mut indexes: Vec<usize> = (0..keys.len()).collect();
    indexes.sort_by(|&left, &right| compare_step_order(keys[left], keys[right]));
    indexes
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_orders_commit_before_enqueue() {
        let orders = [StepOrder::ENQUEUE, StepOrder::DEFAULT, StepOrder::ENQUEUE, StepOrder::DEFAULT];
        assert_eq!(commit_order(&orders), vec![1, 3, 0, 2]);
    }

    #[test]
    fn ties_keep_declaration_order() {
        let orders = [StepOrder::DEFAULT; 5];
        assert_eq!(commit_order(&orders), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn arbitrary_orders_sort_ascending() {
        let orders = [StepOrder(7), StepOrder(-2), StepOrder(3), StepOrder(-2)];
        let order = commit_order(&orders);
        assert_eq!(order, vec![1, 3, 2, 0]);
        assert_eq!(commit_order(&orders), order, "ordering must be deterministic");
    }

    #[test]
    fn ties_follow_mapping_position_not_parameter_index() {
        let keys = [(StepOrder::DEFAULT, 2), (StepOrder::DEFAULT, 0), (StepOrder::ENQUEUE, 1)];
        assert_eq!(commit_sequence(&keys), vec![1, 0, 2]);
    }

    #[test]
    fn comparison_is_antisymmetric() {
        let low = (StepOrder::DEFAULT, 4);
        let high = (StepOrder::ENQUEUE, 0);
        assert_eq!(compare_step_order(low, high), Ordering::Less);
        assert_eq!(compare_step_order(high, low), Ordering::Greater);
        assert_eq!(compare_step_order(low, low), Ordering::Equal);
    }
}
