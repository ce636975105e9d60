//! Property-based tests using QuickCheck

use quickcheck::{Arbitrary, Gen, QuickCheck, TestResult};
use tessera_fhirpath::expression::{call, constant, list, method, Expression};
use tessera_fhirpath::{Environment, Evaluator, FunctionRegistry, Sequence, Value};

/// A small list of small integers, possibly empty.
#[derive(Clone, Debug)]
struct Numbers(Vec<i64>);

impl Arbitrary for Numbers {
    fn arbitrary(g: &mut Gen) -> Self {
        let len = usize::arbitrary(g) % 8;
        Numbers((0..len).map(|_| i64::from(i8::arbitrary(g))).collect())
    }

    fn shrink(&self) -> Box<dyn Iterator<Item = Self>> {
        Box::new(self.0.shrink().map(Numbers))
    }
}

impl Numbers {
    fn expression(&self) -> Expression {
        list(self.0.iter().map(|n| constant(*n)).collect())
    }
}

fn integers(expr: &Expression) -> Option<Vec<i64>> {
    let registry = FunctionRegistry::with_builtins();
    let env = Environment::new(Sequence::empty());
    let values = Evaluator::new(&registry, env).evaluate(expr).ok()?.values().ok()?;
    values.iter().map(Value::as_integer).collect()
}

/// Property: list construction concatenates in order with no gaps
#[test]
fn prop_list_init_concatenates() {
    fn prop(parts: Vec<Numbers>) -> TestResult {
        if parts.len() > 6 {
            return TestResult::discard();
        }
        let expr = list(parts.iter().map(Numbers::expression).collect());
        let expected: Vec<i64> = parts.iter().flat_map(|p| p.0.iter().copied()).collect();
        TestResult::from_bool(integers(&expr) == Some(expected))
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Vec<Numbers>) -> TestResult);
}

/// Property: evaluating the same tree twice gives the same result
#[test]
fn prop_evaluation_is_deterministic() {
    fn prop(a: Numbers, b: Numbers) -> TestResult {
        let expr = call("|", vec![a.expression(), b.expression()]);
        let first = integers(&expr);
        let second = integers(&expr);
        TestResult::from_bool(first.is_some() && first == second)
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Numbers, Numbers) -> TestResult);
}

/// Property: count() equals the number of items produced
#[test]
fn prop_count_matches_length() {
    fn prop(numbers: Numbers) -> TestResult {
        let expr = method(numbers.expression(), "count", vec![]);
        TestResult::from_bool(integers(&expr) == Some(vec![numbers.0.len() as i64]))
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Numbers) -> TestResult);
}

/// Property: union has no duplicates and keeps first occurrences in order
#[test]
fn prop_union_is_ordered_distinct() {
    fn prop(a: Numbers, b: Numbers) -> TestResult {
        let expr = call("|", vec![a.expression(), b.expression()]);
        let mut expected: Vec<i64> = Vec::new();
        for n in a.0.iter().chain(b.0.iter()) {
            if !expected.contains(n) {
                expected.push(*n);
            }
        }
        TestResult::from_bool(integers(&expr) == Some(expected))
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Numbers, Numbers) -> TestResult);
}

/// Property: first() and tail() split a list
#[test]
fn prop_first_and_tail_partition() {
    fn prop(numbers: Numbers) -> TestResult {
        let first = integers(&method(numbers.expression(), "first", vec![]));
        let tail = integers(&method(numbers.expression(), "tail", vec![]));
        match (first, tail) {
            (Some(mut head), Some(rest)) => {
                head.extend(rest);
                TestResult::from_bool(head == numbers.0)
            }
            _ => TestResult::failed(),
        }
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(Numbers) -> TestResult);
}

/// Property: not() is an involution on booleans
#[test]
fn prop_not_involutory() {
    fn prop(b: bool) -> bool {
        let registry = FunctionRegistry::with_builtins();
        let expr = method(method(constant(b), "not", vec![]), "not", vec![]);
        let env = Environment::new(Sequence::empty());
        let result = Evaluator::new(&registry, env)
            .evaluate(&expr)
            .and_then(|seq| seq.scalar());
        result == Ok(Some(Value::boolean(b)))
    }

    QuickCheck::new()
        .tests(100)
        .quickcheck(prop as fn(bool) -> bool);
}
