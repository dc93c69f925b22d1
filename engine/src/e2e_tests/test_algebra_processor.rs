//! An attached algebra processor sees every node.

use std::cell::{Cell, RefCell};

use crate::config::QueryOptions;
use crate::e2e_tests::helpers::{bgp, fixed, store_of, var};
use crate::query::{
    Algebra, AlgebraProcessor, EvaluationContext, Multiset, Query, QueryError, QueryProcessor,
    TriplePattern,
};

/// Counts nodes and falls back to default evaluation.
#[derive(Default)]
struct CountingProcessor {
    calls: Cell<usize>,
    kinds: RefCell<Vec<&'static str>>,
}

impl AlgebraProcessor for CountingProcessor {
    fn process_algebra(
        &self,
        algebra: &Algebra,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Multiset, QueryError> {
        self.calls.set(self.calls.get() + 1);
        let kind = match algebra {
            Algebra::Bgp(_) => "bgp",
            Algebra::Join(..) => "join",
            Algebra::Distinct(_) => "distinct",
            _ => "other",
        };
        self.kinds.borrow_mut().push(kind);
        algebra.evaluate(context)
    }
}

/// Replaces every BGP with no solutions.
struct EmptyBgpProcessor;

impl AlgebraProcessor for EmptyBgpProcessor {
    fn process_algebra(
        &self,
        algebra: &Algebra,
        context: &mut EvaluationContext<'_>,
    ) -> Result<Multiset, QueryError> {
        match algebra {
            Algebra::Bgp(_) => Ok(Multiset::null()),
            _ => algebra.evaluate(context),
        }
    }
}

fn two_pattern_join() -> Algebra {
    Algebra::join(
        bgp(vec![TriplePattern::new(var("a"), fixed("knows"), var("b"))]),
        bgp(vec![TriplePattern::new(var("b"), fixed("knows"), var("c"))]),
    )
    .distinct()
}

#[test]
fn test_processor_receives_every_node() {
    let store = store_of(&[("alice", "knows", "bob"), ("bob", "knows", "carol")]);
    let counting = CountingProcessor::default();
    let processor =
        QueryProcessor::new(&store, QueryOptions::default()).with_algebra_processor(&counting);

    let result = processor.execute(&Query::new(two_pattern_join())).unwrap();
    assert_eq!(result.len(), 1);
    assert_eq!(counting.calls.get(), 4);
    assert_eq!(*counting.kinds.borrow(), vec!["distinct", "join", "bgp", "bgp"]);
}

#[test]
fn test_processor_can_replace_evaluation() {
    let store = store_of(&[("alice", "knows", "bob"), ("bob", "knows", "carol")]);
    let processor = QueryProcessor::new(&store, QueryOptions::default())
        .with_algebra_processor(&EmptyBgpProcessor);
    let result = processor.execute(&Query::new(two_pattern_join())).unwrap();
    assert!(result.is_empty());
}

#[test]
fn test_without_processor_nodes_evaluate_themselves() {
    let store = store_of(&[("alice", "knows", "bob"), ("bob", "knows", "carol")]);
    let processor = QueryProcessor::new(&store, QueryOptions::default());
    let result = processor.execute(&Query::new(two_pattern_join())).unwrap();
    assert_eq!(result.len(), 1);
}
