use std::cmp::Reverse;

use crate::config::PriorityOrder;
use crate::resolver::ResolvedInvocation;

/// Order one pass's invocations for execution: by priority, then by document
/// position. Document order always breaks ties in ascending order.
pub fn schedule<'r>(
    mut resolved: Vec<ResolvedInvocation<'r>>,
    order: PriorityOrder,
) -> Vec<ResolvedInvocation<'r>> {
    match order {
        PriorityOrder::Ascending => resolved.sort_by_key(|r| (r.priority(), r.position)),
        PriorityOrder::Descending => {
            resolved.sort_by_key(|r| (Reverse(r.priority()), r.position))
        }
    }
    resolved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::descriptor::MacroDescriptor;
    use crate::error::MacroExecutionError;
    use crate::macros::{Macro, MacroContext};
    use rstest::rstest;
    use xdom::block::path::{BlockPath, Placement};
    use xdom::block::{Block, Parameters};

    struct Prioritized(MacroDescriptor);

    impl Macro for Prioritized {
        fn descriptor(&self) -> &MacroDescriptor {
            &self.0
        }

        fn execute(
            &self,
            _parameters: &Parameters,
            _content: Option<&str>,
            _context: &MacroContext<'_>,
        ) -> Result<Vec<Block>, MacroExecutionError> {
            Ok(Vec::new())
        }
    }

    #[rstest]
    #[case::ascending(PriorityOrder::Ascending, vec![1, 3, 0, 2])]
    #[case::descending(PriorityOrder::Descending, vec![0, 2, 1, 3])]
    fn sorts_by_priority_then_position(
        #[case] order: PriorityOrder,
        #[case] expected: Vec<usize>,
    ) {
        let high = Prioritized(MacroDescriptor::new("high").with_priority(2000));
        let low = Prioritized(MacroDescriptor::new("low").with_priority(10));
        let macros: [&dyn Macro; 4] = [&high, &low, &high, &low];

        let resolved = macros
            .iter()
            .enumerate()
            .map(|(position, implementation)| ResolvedInvocation {
                path: BlockPath::top(position),
                position,
                placement: Placement::Block,
                implementation: *implementation,
            })
            .collect();

        let positions: Vec<usize> = schedule(resolved, order)
            .iter()
            .map(|r| r.position)
            .collect();
        assert_eq!(positions, expected);
    }
}
