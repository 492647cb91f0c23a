#![allow(dead_code)]

use std::sync::Once;

use qproj::{EnumType, EnumValue, Record, RecordType, Schema, TypeRef, Value};
use tracing_subscriber::EnvFilter;
use uuid::Uuid;

pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn person_type() -> TypeRef {
    TypeRef::Record("Person".into())
}

pub fn schema() -> Schema {
    Schema::new()
        .with_record(
            RecordType::new("Person")
                .field("Id", TypeRef::Uuid)
                .field("Age", TypeRef::Int)
                .field("Score", TypeRef::Int.nullable())
                .field("FavouriteSnack", TypeRef::String)
                .field("FavouriteAnimal", TypeRef::String)
                .field("Nickname", TypeRef::String)
                .field("Mood", TypeRef::Enum("Mood".into()))
                .field("Birthday", TypeRef::Date.nullable())
                .field("IdCard", TypeRef::Record("IdCard".into()).nullable()),
        )
        .with_record(
            RecordType::new("IdCard")
                .field("Number", TypeRef::String)
                .field("FirstName", TypeRef::String)
                .field("LastName", TypeRef::String)
                .field("Person", TypeRef::Record("Person".into()).nullable()),
        )
        .with_enum(
            EnumType::new("Mood")
                .constant("Calm", 1)
                .constant("Grumpy", 2)
                .constant("Sleepy", 3)
                .constant("Hungry", 4),
        )
}

pub fn mood(ordinal: i64) -> Value {
    Value::Enum(EnumValue {
        ordinal,
        name: None,
    })
}

pub fn person(first: &str, age: i64, snack: &str, animal: &str, mood_ordinal: i64) -> Value {
    Value::Record(
        Record::new()
            .with("Id", Uuid::new_v4())
            .with("Age", age)
            .with("Score", Value::Null)
            .with("FavouriteSnack", snack)
            .with("FavouriteAnimal", animal)
            .with("Nickname", Value::Null)
            .with("Mood", mood(mood_ordinal))
            .with("Birthday", Value::Null)
            .with(
                "IdCard",
                Record::new()
                    .with("Number", format!("ID-{first}"))
                    .with("FirstName", first)
                    .with("LastName", "Doe"),
            ),
    )
}

pub fn people() -> Vec<Value> {
    vec![
        person("John", 21, "Cookies", "Lion", 1),
        person("Jane", 34, "Chips", "Zebra", 2),
        person("Mark", 10, "Apples", "Sea Lion", 3),
        person("Anna", 58, "Cookies", "Cat", 4),
    ]
}

pub fn first_name(row: &Value) -> String {
    match row {
        Value::Record(record) => match record.get("IdCard") {
            Some(Value::Record(card)) => card.get("FirstName").map(Value::to_text).unwrap_or_default(),
            _ => String::new(),
        },
        other => panic!("expected a person record, got {other:?}"),
    }
}
