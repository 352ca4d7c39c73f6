// (c) Copyright 2025 Helsing GmbH. All rights reserved.
use std::{cell::RefCell, hint::black_box, rc::Rc};
use tango_bench::{IntoBenchmarks, benchmark_fn, tango_benchmarks, tango_main};
use tomes::{Diff, Event, EventKind, Tree, Value};

/// An object with 255 number properties and a 255 element array of strings.
fn wide_value() -> Value {
    let props = (0..255).map(|i| (i.to_string(), Value::from(i))).collect();
    let items = (0..255).map(|i| Value::from(format!("item-{i}"))).collect();
    let mut root = std::collections::BTreeMap::new();
    root.insert("props".to_string(), Value::Object(props));
    root.insert("items".to_string(), Value::Array(items));
    Value::Object(root)
}

fn conjure_benchmarks() -> impl IntoBenchmarks {
    tomes::enable_determinism();

    let value: &'static Value = Box::leak(Box::new(wide_value()));
    [
        benchmark_fn("tree::conjure", move |b| {
            b.iter(move || Tree::new(black_box(value).clone()))
        }),
        benchmark_fn("tree::value_of", move |b| {
            let tree = Tree::new(value.clone()).unwrap();
            b.iter(move || black_box(&tree).value_of(tree.root()))
        }),
    ]
}

fn array_benchmarks() -> impl IntoBenchmarks {
    tomes::enable_determinism();

    let value: &'static Value = Box::leak(Box::new(wide_value()));
    [
        benchmark_fn("array::push+pop", move |b| {
            let mut tree = Tree::new(value.clone()).unwrap();
            let items = tree.get(tree.root(), "items").unwrap().unwrap();
            b.iter(move || {
                tree.push(items, [Value::Bool(true)]).unwrap();
                tree.pop(black_box(items))
            })
        }),
        benchmark_fn("array::unshift+shift", move |b| {
            let mut tree = Tree::new(value.clone()).unwrap();
            let items = tree.get(tree.root(), "items").unwrap().unwrap();
            b.iter(move || {
                tree.unshift(items, [Value::Bool(true)]).unwrap();
                tree.shift(black_box(items))
            })
        }),
        benchmark_fn("array::splice", move |b| {
            let mut tree = Tree::new(value.clone()).unwrap();
            let items = tree.get(tree.root(), "items").unwrap().unwrap();
            b.iter(move || tree.splice(black_box(items), 128, 1, [Value::Null]))
        }),
        benchmark_fn("array::reverse", move |b| {
            let mut tree = Tree::new(value.clone()).unwrap();
            let items = tree.get(tree.root(), "items").unwrap().unwrap();
            b.iter(move || tree.reverse(black_box(items)))
        }),
    ]
}

fn object_benchmarks() -> impl IntoBenchmarks {
    tomes::enable_determinism();

    let value: &'static Value = Box::leak(Box::new(wide_value()));
    [
        benchmark_fn("object::set", move |b| {
            let mut tree = Tree::new(value.clone()).unwrap();
            let props = tree.get(tree.root(), "props").unwrap().unwrap();
            let mut n = 0u32;
            b.iter(move || {
                n = n.wrapping_add(1);
                tree.set(black_box(props), "128", n)
            })
        }),
        benchmark_fn("object::rename", move |b| {
            let mut tree = Tree::new(value.clone()).unwrap();
            let props = tree.get(tree.root(), "props").unwrap().unwrap();
            let mut flip = false;
            b.iter(move || {
                flip = !flip;
                let (from, to) = if flip { ("128", "duck") } else { ("duck", "128") };
                tree.rename(black_box(props), from, to)
            })
        }),
        benchmark_fn("scalar::inc", move |b| {
            let mut tree = Tree::new(value.clone()).unwrap();
            let props = tree.get(tree.root(), "props").unwrap().unwrap();
            let n = tree.get(props, "128").unwrap().unwrap();
            b.iter(move || tree.inc(black_box(n), 1.0))
        }),
    ]
}

fn replay_benchmarks() -> impl IntoBenchmarks {
    tomes::enable_determinism();

    let value: &'static Value = Box::leak(Box::new(wide_value()));

    // one record per mutation, the way a remote peer would receive them
    let mut source = Tree::new(value.clone()).unwrap();
    let records = Rc::new(RefCell::new(Vec::<Diff>::new()));
    let sink = Rc::clone(&records);
    source
        .on(source.root(), EventKind::Diff, move |e| {
            if let Event::Diff(d) = e {
                sink.borrow_mut().push(d.clone());
            }
        })
        .unwrap();
    let props = source.get(source.root(), "props").unwrap().unwrap();
    let items = source.get(source.root(), "items").unwrap().unwrap();
    for i in 0..64 {
        source.set(props, format!("new-{i}"), i).unwrap();
        source.push(items, [Value::from(i)]).unwrap();
    }
    let records: &'static Vec<Diff> = Box::leak(Box::new(records.take()));

    [
        benchmark_fn("replay::consume", move |b| {
            b.iter(move || {
                let mut tree = Tree::new(value.clone()).unwrap();
                tree.consume(black_box(records).iter()).unwrap();
                tree
            })
        }),
        benchmark_fn("replay::paused-batch", move |b| {
            b.iter(move || {
                let mut tree = Tree::new(value.clone()).unwrap();
                let items = tree.get(tree.root(), "items").unwrap().unwrap();
                tree.pause();
                for i in 0..64 {
                    tree.push(items, [Value::from(i)]).unwrap();
                }
                tree.resume();
                tree
            })
        }),
    ]
}

tango_benchmarks!(
    conjure_benchmarks(),
    array_benchmarks(),
    object_benchmarks(),
    replay_benchmarks()
);
tango_main!();
