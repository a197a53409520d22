use std::{borrow::Cow, cell::Cell, thread};

use propcell::{
    Accessor, Lazy, PropError, PropertyDecl, WriteAccessor,
    accessor::{Computed, ReadOnly, Stored, rules},
    lazy::infallible,
};

fn positive_property() -> Stored<i32> {
    PropertyDecl::new("value")
        .rule(rules::predicate("positive", "must be greater than zero", |v: &i32| *v > 0))
        .mutable()
}

#[test]
fn rejected_write_keeps_previous_value() {
    let mut value = positive_property();

    value.write(5).unwrap();
    assert_eq!(value.read(), Ok(5));

    let err = value.write(-1).unwrap_err();
    assert_eq!(err.property, "value");
    assert_eq!(err.reason, "must be greater than zero");
    assert_eq!(err.into_value(), -1);
    assert_eq!(value.read(), Ok(5));
}

#[test]
fn accepted_writes_round_trip() {
    let mut value = positive_property();
    for candidate in [1, 2, 17, 1_000, i32::MAX] {
        value.write(candidate).unwrap();
        assert_eq!(value.read(), Ok(candidate));
    }
}

#[test]
fn late_property_reports_uninitialized_access() {
    let value = positive_property();
    assert_eq!(
        value.read(),
        Err(PropError::UninitializedAccess {
            property: Cow::Borrowed("value")
        })
    );
}

#[test]
fn validation_error_converts_into_prop_error() {
    fn bump(value: &mut Stored<i32>, by: i32) -> Result<i32, PropError> {
        let next = value.read()? + by;
        value.write(next)?;
        value.read()
    }

    let mut value = positive_property();
    value.write(3).unwrap();
    assert_eq!(bump(&mut value, 2), Ok(5));
    assert!(matches!(
        bump(&mut value, -10),
        Err(PropError::Validation { ref rule, .. }) if rule == "positive"
    ));
    assert_eq!(value.read(), Ok(5));
}

#[test]
fn computed_and_stored_accessors_share_one_surface() {
    fn describe<A: Accessor<Value = String>>(accessor: &A) -> String {
        format!("{} = {}", accessor.name(), accessor.read().unwrap())
    }

    let first = Stored::new("first", String::from("Ada"));
    let family = Stored::new("family", String::from("Lovelace"));
    let full = Computed::new("full_name", || {
        format!("{} {}", first.read().unwrap(), family.read().unwrap())
    });

    assert_eq!(describe(&first), "first = Ada");
    assert_eq!(describe(&full), "full_name = Ada Lovelace");
    assert_eq!(describe(&ReadOnly::new(&family)), "family = Lovelace");
}

#[test]
fn lazy_backed_accessor_composes_with_map() {
    let evaluations = Cell::new(0);
    let lazy = Lazy::named(
        "words",
        infallible(|| {
            evaluations.set(evaluations.get() + 1);
            vec!["lazy", "cell"]
        }),
    );
    let count = lazy.accessor().map(|words| words.len());

    assert_eq!(count.read(), Ok(2));
    assert_eq!(count.read(), Ok(2));
    assert_eq!(evaluations.get(), 1);
}

#[test]
fn shared_reader_cannot_write_but_sees_writes() {
    let stored = PropertyDecl::new("status")
        .initial(String::from("idle"))
        .rule(rules::non_empty())
        .mutable();
    let (mut writer, reader) = stored.into_shared();

    let observer = thread::spawn({
        let reader = reader.clone();
        move || reader.read()
    });
    let before = observer.join().unwrap().unwrap();
    assert!(before == "idle");

    writer.write("busy".into()).unwrap();
    assert!(writer.write(String::new()).is_err());
    assert_eq!(reader.read().as_deref(), Ok("busy"));
}
