//! 规则引擎性能基准测试
//!
//! 覆盖内置操作符、路径解析和组合规则的递归求值。

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use predicate_engine::{
    ConditionEvaluator, DottedPathAccessor, Engine, FieldAccessor, Operator, RuleSet,
};
use serde_json::{Value, json};
use std::hint::black_box;

fn create_record() -> Value {
    json!({
        "event": {"type": "PURCHASE", "source": "mobile_app"},
        "order": {"amount": 1500, "items": ["TICKET-001", "FOOD-001"]},
        "user": {
            "level": "gold",
            "is_vip": true,
            "profile": {"nickname": "this is amazing", "age": 32}
        }
    })
}

/// 内置操作符基准
fn bench_operators(c: &mut Criterion) {
    let mut group = c.benchmark_group("operators");

    let number = json!(1000);
    let threshold = json!(500);
    let text = json!("hello world");
    let needle = json!("world");

    for op in [Operator::Eq, Operator::Neq, Operator::Gt, Operator::Lte] {
        group.bench_function(op.symbol(), |b| {
            b.iter(|| {
                ConditionEvaluator::evaluate(black_box(&number), black_box(op), black_box(&threshold))
            })
        });
    }

    for op in [Operator::Contains, Operator::StartsWith, Operator::EndsWith] {
        group.bench_function(op.symbol(), |b| {
            b.iter(|| {
                ConditionEvaluator::evaluate(black_box(&text), black_box(op), black_box(&needle))
            })
        });
    }

    group.finish();
}

/// 路径深度对取值的影响
fn bench_path_resolution(c: &mut Criterion) {
    let mut group = c.benchmark_group("path_resolution");

    for depth in [1usize, 4, 16] {
        let mut record = json!("leaf");
        for _ in 0..depth {
            record = json!({ "n": record });
        }
        let path = vec!["n"; depth].join(".");

        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, _| {
            b.iter(|| DottedPathAccessor.resolve(black_box(&record), black_box(&path)))
        });
    }

    group.finish();
}

/// 组合规则求值
fn bench_rule_evaluation(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_evaluation");
    let engine = Engine::new();
    let record = create_record();

    let simple = RuleSet::from_value(&json!({"key": "event.type", "value": "PURCHASE"}));
    group.bench_function("single_leaf", |b| {
        b.iter(|| engine.evaluate(black_box(&record), black_box(&simple)))
    });

    let complex = RuleSet::from_value(&json!([
        {"key": "event.type", "value": "PURCHASE"},
        {
            "every": [
                {"key": "order.amount", "op": ">=", "value": 1000},
                {"key": "user.profile.age", "op": "<", "value": 60}
            ],
            "some": [
                {"key": "user.level", "value": "platinum"},
                {"key": "user.profile.nickname", "op": "$", "value": "amazing"}
            ],
            "not": {"key": "event.source", "op": "^", "value": "customer"}
        }
    ]));
    group.bench_function("composite", |b| {
        b.iter(|| engine.evaluate(black_box(&record), black_box(&complex)))
    });

    group.bench_function("composite_explain", |b| {
        b.iter(|| engine.explain(black_box(&record), black_box(&complex)))
    });

    group.finish();
}

/// some 列表长度对短路求值的影响
fn bench_some_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("some_scaling");
    let engine = Engine::new();
    let record = create_record();

    for size in [5usize, 50, 500] {
        // 只有最后一个子节点匹配
        let children: Vec<Value> = (0..size)
            .map(|i| {
                if i == size - 1 {
                    json!({"key": "user.level", "value": "gold"})
                } else {
                    json!({"key": "user.level", "value": format!("level_{}", i)})
                }
            })
            .collect();
        let rules = RuleSet::from_value(&json!({ "some": children }));

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| engine.evaluate(black_box(&record), black_box(&rules)))
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_operators,
    bench_path_resolution,
    bench_rule_evaluation,
    bench_some_scaling
);

criterion_main!(benches);
