//! End-to-end behaviour of values, handles and references

use std::sync::Arc;

use escript_value::{
    ArgList, BinaryOp, CallError, Executor, Kind, MethodId, Pooled, Reference, Runtime,
    RuntimeConfig, Value, binary,
};

fn int_array(rt: &Runtime, items: &[i32]) -> Reference {
    rt.bind(rt.array(items.iter().copied().map(Value::from)))
}

#[test]
fn test_pack_round_trip_for_core_kinds() {
    let rt = Runtime::new();
    let samples = vec![
        Value::from(-17),
        Value::from(2.25),
        Value::from("héllo"),
        rt.array([Value::from(1), Value::from("two"), Value::from(3.0)]),
        rt.struct_value([("name", Value::from("Bob")), ("hp", Value::from(100))]),
        Value::error("Divide by Zero"),
        Value::Uninit,
    ];

    for value in samples {
        let bytes = value.pack().expect("in-memory packing does not fail");
        let decoded = rt.unpack(&bytes).map_err(|e| e.to_string());
        assert_eq!(decoded, Ok(value));
    }
}

#[test]
fn test_last_reference_returns_pool_block() {
    let rt = Runtime::new();
    let first = rt.bind(Value::from(42));
    let mut others: Vec<Reference> = (0..3).map(|_| first.clone()).collect();
    assert_eq!(rt.pool_stats(Kind::Integer).in_use(), 1);

    drop(first);
    others.truncate(1);
    assert_eq!(rt.pool_stats(Kind::Integer).in_use(), 1);
    assert_eq!(*others[0].handle().value(), Value::from(42));

    drop(others);
    let stats = rt.pool_stats(Kind::Integer);
    assert_eq!(stats.in_use(), 0);
    assert_eq!(stats.deallocated, 1);
}

#[test]
fn test_instrumentation_tracks_live_handles() {
    let rt = Runtime::with_config(RuntimeConfig::new().with_instrumentation(true));
    let a = rt.bind(Value::from(1));
    let b = rt.bind(Value::from("x"));
    let kinds: Vec<Kind> = rt.live_instances().into_iter().map(|(_, kind)| kind).collect();
    assert_eq!(kinds, vec![Kind::Integer, Kind::String]);

    drop(a);
    drop(b);
    assert!(rt.live_instances().is_empty());
    assert_eq!(rt.instance_stats().map(|s| s.live), Some(0));
}

#[test]
fn test_references_alias_one_handle() {
    let rt = Runtime::new();
    let a = rt.bind(Value::from(1));
    let b = a.clone();
    a.handle().assign(&Value::from("changed"));
    assert_eq!(*b.handle().value(), Value::from("changed"));
    assert!(a.ptr_eq(&b));
}

#[test]
fn test_cloned_handles_do_not_alias() {
    let rt = Runtime::new();
    let a = rt.bind(Value::from(1));
    let b = Reference::new(Arc::new(a.handle().clone_handle()));
    assert!(Pooled::ptr_eq(&a.handle().imp_ptr(), &b.handle().imp_ptr()));

    b.handle().assign(&Value::from(2));
    assert_eq!(*a.handle().value(), Value::from(1));
    assert_eq!(*b.handle().value(), Value::from(2));
}

#[test]
fn test_uninit_is_shared() {
    let rt = Runtime::new();
    let a = rt.uninit();
    let b = rt.uninit();
    assert_eq!(*a.handle().value(), *b.handle().value());
    assert!(!a.handle().is_true());
    assert!(!b.handle().is_true());
    assert!(Pooled::ptr_eq(&a.handle().imp_ptr(), &b.handle().imp_ptr()));
    assert_eq!(rt.pool_stats(Kind::Uninit).in_use(), 1);

    drop((a, b));
    let c = rt.uninit();
    assert!(c.handle().value().is_uninit());
    assert_eq!(rt.pool_stats(Kind::Uninit).allocated, 1);
}

#[test]
fn test_operator_exemplars() {
    let rt = Runtime::new();
    let add = |l: Value, r: Value| binary(&rt, BinaryOp::Add, &l, &r);

    assert_eq!(add(Value::from(3), Value::from(4)), Value::from(7));
    assert_eq!(add(Value::from(3), Value::from(2.5)), Value::from(5.5));
    assert_eq!(
        binary(&rt, BinaryOp::Mod, &Value::from(10), &Value::from(3)),
        Value::from(1)
    );

    let arr = rt.array([Value::from(1)]);
    let result = binary(&rt, BinaryOp::Mod, &arr, &Value::from("s"));
    assert_eq!(
        result,
        Value::error("Operator % undefined for Array and String")
    );
}

#[test]
fn test_errors_propagate_left_most() {
    let rt = Runtime::new();
    let left = Value::error("left");
    let right = Value::error("right");
    assert_eq!(binary(&rt, BinaryOp::Mul, &left, &right), left);
    assert_eq!(binary(&rt, BinaryOp::Mul, &Value::from(2), &right), right);
}

#[test]
fn test_one_based_array_access() {
    let rt = Runtime::new();
    let arr = int_array(&rt, &[10, 20, 30]);
    let at = |i: i32| arr.handle().oper_subscript(&Value::from(i)).handle().value().clone();

    assert_eq!(at(1), Value::from(10));
    assert_eq!(at(3), Value::from(30));
    assert_eq!(at(0), Value::error("Index out of bounds"));
    assert_eq!(at(4), Value::error("Index out of bounds"));
}

#[test]
fn test_struct_member_lookup() {
    let rt = Runtime::new();
    let st = rt.bind(rt.struct_value([("foo", Value::from(5))]));

    let foo = st.handle().get_member("foo");
    assert_eq!(*foo.handle().value(), Value::from(5));
    assert!(st.handle().get_member("FOO").ptr_eq(&foo));
    assert!(st.handle().get_member("bar").is_null());

    let id = rt.member_id("foo");
    assert!(st.handle().get_member_id(id).ptr_eq(&foo));
}

#[test]
fn test_member_writes_show_in_struct() {
    let rt = Runtime::new();
    let st = rt.bind(rt.struct_value([("hp", Value::from(5))]));
    st.handle().get_member("hp").handle().increment();
    st.handle().set_member("mana", &Value::from(3), true);
    assert_eq!(st.handle().value().to_string(), "struct{ hp = 6, mana = 3 }");
}

#[test]
fn test_array_add_assign_is_visible_through_aliases() {
    let rt = Runtime::new();
    let arr = int_array(&rt, &[1, 2]);
    let alias = arr.clone();
    arr.handle().apply_in_place(BinaryOp::Add, &Value::from(3));
    assert_eq!(alias.handle().value().to_string(), "{ 1, 2, 3 }");
}

#[test]
fn test_array_copies_are_isolated() {
    let rt = Runtime::new();
    let original = int_array(&rt, &[1, 2]);
    let copy = rt.bind(original.handle().value().clone());

    copy.handle().array_assign(1, &Value::from(99), true);
    copy.handle().apply_in_place(BinaryOp::Add, &Value::from(3));

    assert_eq!(original.handle().value().to_string(), "{ 1, 2 }");
    assert_eq!(copy.handle().value().to_string(), "{ 99, 2, 3 }");
}

#[test]
fn test_array_assign_grows_with_uninit() {
    let rt = Runtime::new();
    let arr = int_array(&rt, &[1]);
    arr.handle().array_assign(3, &Value::from(3), false);
    assert_eq!(
        arr.handle().value().to_string(),
        "{ 1, <uninitialized object>, 3 }"
    );
}

#[test]
fn test_foreach_uses_snapshot() {
    let rt = Runtime::new();
    let arr = int_array(&rt, &[1, 2, 3]);
    let counter = rt.uninit();
    let mut seen = Vec::new();

    if let Some(iter) = arr.handle().create_iterator(counter.clone()) {
        for element in iter {
            seen.push(element.handle().value().clone());
            arr.handle().apply_in_place(BinaryOp::Add, &Value::from(0));
        }
    }

    assert_eq!(seen, vec![Value::from(1), Value::from(2), Value::from(3)]);
    assert_eq!(*counter.handle().value(), Value::from(3));
    assert_eq!(arr.handle().value().as_obj_array().map(|a| a.len()), Some(6));
}

#[test]
fn test_in_operator() {
    let rt = Runtime::new();
    let arr = rt.array([Value::from("a"), Value::from(2)]);
    assert_eq!(arr.contains(&Value::from(2.0)), 2);
    assert_eq!(arr.contains(&Value::from("z")), 0);
    assert_eq!(Value::from("hello").contains(&Value::from("ll")), 3);
}

#[test]
fn test_builtin_methods() {
    let rt = Runtime::new();
    let arr = int_array(&rt, &[3, 1, 2]);

    let mut args = ArgList::from_values(&rt, [Value::from(0)]);
    assert_eq!(arr.handle().call_method("APPEND", &mut args), Ok(Value::from(1)));

    let mut none = ArgList::new();
    assert_eq!(arr.handle().call_method("sort", &mut none), Ok(Value::from(1)));
    assert_eq!(arr.handle().value().to_string(), "{ 0, 1, 2, 3 }");
    assert_eq!(arr.handle().call_method("size", &mut none), Ok(Value::from(4)));

    let text = rt.bind(Value::from("Hello"));
    assert_eq!(text.handle().call_method("upper", &mut none), Ok(Value::from("HELLO")));
}

#[test]
fn test_method_call_errors() {
    let rt = Runtime::new();
    let num = rt.bind(Value::from(1));
    let mut none = ArgList::new();

    assert_eq!(
        num.handle().call_method("frobnicate", &mut none),
        Err(CallError::UnknownMethod {
            kind: Kind::Integer,
            name: "frobnicate".to_string()
        })
    );
    assert_eq!(
        num.handle().call_method("size", &mut none),
        Err(CallError::NotSupported {
            kind: Kind::Integer,
            method: MethodId::Size
        })
    );

    let arr = int_array(&rt, &[]);
    let result = arr.handle().call_method("append", &mut none);
    assert!(result.is_ok_and(|v| v.is_error()));
}

struct Overriding {
    params: Vec<Reference>,
}

impl Executor for Overriding {
    fn params(&self) -> &[Reference] {
        &self.params
    }

    fn script_method(&mut self, _target: &Value, id: MethodId) -> Option<Value> {
        (id == MethodId::Size).then(|| Value::from(-1))
    }
}

#[test]
fn test_script_methods_take_precedence() {
    let rt = Runtime::new();
    let arr = int_array(&rt, &[1, 2]);
    let mut ex = Overriding { params: Vec::new() };

    assert_eq!(arr.handle().call_method("size", &mut ex), Ok(Value::from(-1)));
    assert_eq!(
        arr.handle().call_method_id(MethodId::Size, &mut ex, true),
        Ok(Value::from(2))
    );
}

#[test]
fn test_runtime_is_shared_across_threads() {
    let rt = Runtime::new();
    let workers: Vec<_> = (0..4)
        .map(|i| {
            let rt = rt.clone();
            std::thread::spawn(move || {
                let total = rt.bind(Value::from(0));
                for _ in 0..100 {
                    total.handle().apply_in_place(BinaryOp::Add, &Value::from(i));
                }
                total.handle().value().as_int()
            })
        })
        .collect();

    let totals: Vec<Option<i32>> = workers
        .into_iter()
        .map(|w| w.join().ok().flatten())
        .collect();
    assert_eq!(totals, vec![Some(0), Some(100), Some(200), Some(300)]);
    assert_eq!(rt.pool_stats(Kind::Integer).in_use(), 0);
}
