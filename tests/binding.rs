//! Binding behaviour through the public API: descriptor + argv → values.

use cliframe::config::MapEnv;
use cliframe::{
    ArgumentDescriptor, BindError, Binder, BoundValues, Command, CommandDescriptor, CommandResult,
    EnumDef, InvocationContext, OptionDescriptor, Target, TypeId, TypeRegistry, Value, ValueSource,
};
use futures::future::BoxFuture;
use futures::FutureExt;

struct Noop;

impl Command for Noop {
    fn execute(self: Box<Self>, _ctx: InvocationContext) -> BoxFuture<'static, CommandResult> {
        async { Ok(()) }.boxed()
    }
}

fn noop(_: &BoundValues) -> Result<Box<dyn Command>, BindError> {
    Ok(Box::new(Noop))
}

fn argv(args: &[&str]) -> Vec<String> {
    args.iter().map(|s| s.to_string()).collect()
}

fn greet() -> CommandDescriptor {
    CommandDescriptor::builder("greet")
        .option(OptionDescriptor::new("name", TypeId::String).required())
        .argument(ArgumentDescriptor::new(0, "count", TypeId::I32))
        .build_with(noop)
        .unwrap()
}

fn bind(descriptor: &CommandDescriptor, args: &[&str]) -> Result<BoundValues, BindError> {
    let types = TypeRegistry::new();
    let env = MapEnv::default();
    Binder::new(&types, &env).bind_values(descriptor, &argv(args))
}

#[test]
fn test_scenario_name_only_defaults_count() {
    let values = bind(&greet(), &["--name", "svc"]).unwrap();
    assert_eq!(values.value::<String>("name").unwrap(), "svc");
    assert_eq!(values.value::<i32>("count").unwrap(), 0);
    assert_eq!(values.source("count"), Some(ValueSource::Default));
}

#[test]
fn test_scenario_empty_argv_is_missing_name() {
    let err = bind(&greet(), &[]).unwrap_err();
    assert_eq!(
        err,
        BindError::MissingRequiredOption {
            option: "name".into(),
            flag: "--name".into(),
        }
    );
    assert_eq!(err.exit_code(), cliframe::exit::MISSING_REQUIRED);
}

#[test]
fn test_scenario_count_positional() {
    let values = bind(&greet(), &["--name", "svc", "7"]).unwrap();
    assert_eq!(values.value::<String>("name").unwrap(), "svc");
    assert_eq!(values.value::<i32>("count").unwrap(), 7);
}

#[test]
fn test_scenario_bad_count_is_invalid_value() {
    let err = bind(&greet(), &["--name", "svc", "x"]).unwrap_err();
    match &err {
        BindError::InvalidValue { target, value, .. } => {
            assert_eq!(
                target,
                &Target::Argument {
                    name: "count".into(),
                    position: 0
                }
            );
            assert_eq!(value, "x");
        }
        other => panic!("expected InvalidValue, got {:?}", other),
    }
    assert!(err.to_string().contains("'x'"));
    assert!(err.to_string().contains("position 0"));
}

#[test]
fn test_full_bind_instantiates_command() {
    let types = TypeRegistry::new();
    let env = MapEnv::default();
    let bound = Binder::new(&types, &env)
        .bind(&greet(), &argv(&["--name", "svc"]))
        .unwrap();
    assert_eq!(bound.name(), "greet");
    assert_eq!(bound.values().len(), 2);
}

fn tagged() -> CommandDescriptor {
    CommandDescriptor::builder("tag")
        .option(
            OptionDescriptor::new("tag", TypeId::list(TypeId::String))
                .short('t')
                .env("TAGS"),
        )
        .option(OptionDescriptor::new("port", TypeId::list(TypeId::U32)))
        .build_with(noop)
        .unwrap()
}

#[test]
fn test_repeated_flags_accumulate_in_order() {
    for n in 0..5 {
        let mut args = Vec::new();
        let expected: Vec<String> = (0..n).map(|i| format!("t{}", i)).collect();
        for tag in &expected {
            args.push("--tag");
            args.push(tag.as_str());
        }
        let values = bind(&tagged(), &args).unwrap();
        assert_eq!(values.value::<Vec<String>>("tag").unwrap(), expected);
    }
}

#[test]
fn test_mixed_short_and_long_occurrences_keep_order() {
    let values = bind(&tagged(), &["-t", "a", "--tag=b", "-t=c", "--port", "80", "--port", "443"]).unwrap();
    assert_eq!(values.value::<Vec<String>>("tag").unwrap(), ["a", "b", "c"]);
    assert_eq!(values.value::<Vec<u32>>("port").unwrap(), [80, 443]);
}

#[test]
fn test_collection_env_fallback_is_split() {
    let types = TypeRegistry::new();
    let env = MapEnv::from_pairs([("TAGS", "red, green,,blue")]);
    let values = Binder::new(&types, &env)
        .bind_values(&tagged(), &[])
        .unwrap();
    assert_eq!(values.value::<Vec<String>>("tag").unwrap(), ["red", "green", "blue"]);
    assert_eq!(values.source("tag"), Some(ValueSource::Environment));
}

#[test]
fn test_argv_beats_env() {
    let types = TypeRegistry::new();
    let env = MapEnv::from_pairs([("TAGS", "from-env")]);
    let values = Binder::new(&types, &env)
        .bind_values(&tagged(), &argv(&["-t", "from-argv"]))
        .unwrap();
    assert_eq!(values.value::<Vec<String>>("tag").unwrap(), ["from-argv"]);
}

#[test]
fn test_required_option_satisfied_by_env() {
    let descriptor = CommandDescriptor::builder("deploy")
        .option(
            OptionDescriptor::new("region", TypeId::String)
                .env("REGION")
                .required(),
        )
        .build_with(noop)
        .unwrap();
    let types = TypeRegistry::new();

    let env = MapEnv::from_pairs([("REGION", "eu-west")]);
    let values = Binder::new(&types, &env)
        .bind_values(&descriptor, &[])
        .unwrap();
    assert_eq!(values.value::<String>("region").unwrap(), "eu-west");

    let empty = MapEnv::default();
    let err = Binder::new(&types, &empty)
        .bind_values(&descriptor, &[])
        .unwrap_err();
    assert!(matches!(err, BindError::MissingRequiredOption { ref option, .. } if option == "region"));
}

#[test]
fn test_enum_outside_choices_lists_every_member() {
    let types = TypeRegistry::new();
    types
        .register_enum(EnumDef::new("Color", ["red", "green", "blue"]))
        .unwrap();
    let descriptor = CommandDescriptor::builder("paint")
        .option(OptionDescriptor::new("color", TypeId::enumeration("Color")))
        .build_with(noop)
        .unwrap();
    let env = MapEnv::default();
    let binder = Binder::new(&types, &env);

    let err = binder
        .bind_values(&descriptor, &argv(&["--color", "purple"]))
        .unwrap_err();
    match err {
        BindError::Validation { message, .. } => {
            assert_eq!(
                message,
                "'purple' is not a valid choice. Valid choices are:\nred\ngreen\nblue"
            );
        }
        other => panic!("expected Validation, got {:?}", other),
    }

    let values = binder.bind_values(&descriptor, &[]).unwrap();
    assert_eq!(values.get("color"), Some(&Value::Enum("red".into())));
}

#[test]
fn test_case_insensitive_enum_yields_canonical_member() {
    let types = TypeRegistry::new();
    types
        .register_enum(EnumDef::new("Color", ["Red", "Green"]))
        .unwrap();
    let descriptor = CommandDescriptor::builder("paint")
        .option(OptionDescriptor::new("color", TypeId::enumeration("Color")).ignore_case())
        .build_with(noop)
        .unwrap();
    let env = MapEnv::default();
    let values = Binder::new(&types, &env)
        .bind_values(&descriptor, &argv(&["--color", "GREEN"]))
        .unwrap();
    assert_eq!(values.value::<String>("color").unwrap(), "Green");
}

#[test]
fn test_binding_is_deterministic() {
    let descriptor = greet();
    for args in [
        &["--name", "svc", "7"][..],
        &["--name", "svc", "x"][..],
        &[][..],
        &["--name", "a", "--name", "b"][..],
    ] {
        let first = bind(&descriptor, args);
        let second = bind(&descriptor, args);
        assert_eq!(first, second);
        if let (Err(a), Err(b)) = (&first, &second) {
            assert_eq!(a.kind(), b.kind());
            assert_eq!(a.to_string(), b.to_string());
        }
    }
}

#[test]
fn test_scalar_last_occurrence_wins() {
    let values = bind(&greet(), &["--name", "a", "--name", "b"]).unwrap();
    assert_eq!(values.value::<String>("name").unwrap(), "b");
}

#[test]
fn test_surplus_positional_is_rejected() {
    let err = bind(&greet(), &["--name", "svc", "1", "2"]).unwrap_err();
    assert_eq!(err, BindError::UnexpectedArgument { value: "2".into() });
}

#[test]
fn test_bool_map_and_switches() {
    let descriptor = CommandDescriptor::builder("build")
        .option(OptionDescriptor::new("feature", TypeId::BoolMap))
        .option(OptionDescriptor::new("dry-run", TypeId::Bool))
        .build_with(noop)
        .unwrap();

    let values = bind(
        &descriptor,
        &["--feature", "fast", "--feature", "debug=no", "--dry-run"],
    )
    .unwrap();
    let features: std::collections::BTreeMap<String, bool> = values.value("feature").unwrap();
    assert_eq!(features.get("fast"), Some(&true));
    assert_eq!(features.get("debug"), Some(&false));
    assert!(values.value::<bool>("dry_run").unwrap());

    let values = bind(&descriptor, &["--dry-run=false"]).unwrap();
    assert!(!values.value::<bool>("dry_run").unwrap());
}

#[test]
fn test_help_flag_short_circuits() {
    let err = bind(&greet(), &["--name", "svc", "-h"]).unwrap_err();
    assert_eq!(err, BindError::HelpRequested { command: "greet".into() });
    assert_eq!(err.exit_code(), 0);
}
