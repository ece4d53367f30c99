use criterion::{black_box, criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use keepgraph::graph::code::{Instruction, InvokeKind, MethodCode, MethodRef};
use keepgraph::graph::{AccessFlags, ClassDef, FieldDef, MethodDef, ProgramBuilder};
use keepgraph::{Config, Program, ReachabilityEngine};

/// A program of `size` classes in chains of four, every chain rooted in a
/// serializable class, with native methods and reflective lookups sprinkled in
fn synthetic_program(size: usize) -> Program {
    let mut builder = ProgramBuilder::new()
        .class(ClassDef::new("Ljava/lang/Object;").without_super().external())
        .class(
            ClassDef::new("Ljava/io/Serializable;")
                .with_access(AccessFlags::PUBLIC | AccessFlags::INTERFACE)
                .external(),
        );

    for i in 0..size {
        let name = format!("Lcom/bench/C{};", i);
        let mut class = ClassDef::new(&name)
            .with_method(MethodDef::constructor())
            .with_method(MethodDef::new("run").with_args(&["I"]))
            .with_field(FieldDef::new("value", "I"));

        if i % 4 == 0 {
            class = class.with_interface("Ljava/io/Serializable;");
        } else {
            class = class.with_super(format!("Lcom/bench/C{};", i - 1));
        }
        if i % 7 == 0 {
            class = class.with_method(
                MethodDef::new("nativeRun").with_access(AccessFlags::PUBLIC | AccessFlags::NATIVE),
            );
        }
        if i % 5 == 0 {
            let target = format!("Lcom/bench/C{};", (i * 31) % size);
            class = class.with_method(MethodDef::new("reflect").with_code(MethodCode::new(vec![
                Instruction::ConstClass { dest: 0, ty: target },
                Instruction::ConstString { dest: 1, value: "value".to_string() },
                Instruction::Invoke {
                    kind: InvokeKind::Virtual,
                    method: MethodRef::new("Ljava/lang/Class;", "getField"),
                    args: vec![0, 1],
                },
                Instruction::Return { src: None },
            ])));
        }

        builder.add_class(class);
    }

    builder.build()
}

fn reachability_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("init_reachable_classes");

    for size in [1_000, 10_000] {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_function(format!("{}_classes", size), |b| {
            b.iter_batched(
                || synthetic_program(size),
                |program| {
                    let engine = ReachabilityEngine::new(&program, Config::default());
                    engine.init_reachable_classes().unwrap();
                    black_box(program.class_count())
                },
                BatchSize::LargeInput,
            );
        });
    }

    group.finish();
}

criterion_group!(benches, reachability_benchmark);
criterion_main!(benches);
