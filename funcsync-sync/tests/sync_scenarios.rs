//! End-to-end scenarios over in-memory collaborators.

use funcsync_core::{Config, MemoryStore, ReadinessPolicy, Registry, RegistryStore, TableName};
use funcsync_sync::{handle_event_json, pipeline, AddAction, MemorySource, Revisions};

const ORDER_TEMPLATE: &str = r#"AWSTemplateFormatVersion: "2010-09-09"
Resources:
  OrderFunction:
    Type: AWS::Serverless::Function
    Properties:
      Handler: index.handler
      FunctionName: orderProcessor
      Role: !GetAtt OrderRole.Arn
  OrderBucket:
    Type: AWS::S3::Bucket
    Properties:
      BucketName: !Sub "${AWS::StackName}-orders"
"#;

const BUGS_TEMPLATE: &str = r#"Resources:
  BugsFunction:
    Type: AWS::Serverless::Function
    Properties:
      Handler: index.list
      FunctionName: listBugs
"#;

const NO_HANDLER_TEMPLATE: &str = r#"Resources:
  Queue:
    Type: AWS::SQS::Queue
    Properties:
      FunctionName: notAFunction
"#;

fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}

fn registry() -> Registry<MemoryStore> {
    Registry::new(MemoryStore::with_creation_polls(1), ReadinessPolicy::immediate(5))
}

fn sync(source: &MemorySource, registry: &Registry<MemoryStore>, before: &str, after: &str) {
    let revisions = Revisions::Range {
        before: Some(before.to_string()),
        after: after.to_string(),
    };
    let outcome = pipeline::run(source, registry, &Config::default(), "orders", &revisions)
        .expect("pipeline");
    assert_eq!(outcome.report.failed(), 0, "{:#?}", outcome.report);
}

fn index_functions(registry: &Registry<MemoryStore>) -> String {
    registry
        .store()
        .items(&TableName::from("index"))
        .first()
        .map(|item| item.function_names.joined())
        .unwrap_or_default()
}

#[test]
fn added_template_registers_its_function() {
    init_logging();
    let mut source = MemorySource::new();
    source
        .add_commit("orders", "c0", &[], &[])
        .add_commit("orders", "c1", &["c0"], &[("service/template.yaml", ORDER_TEMPLATE)]);
    let registry = registry();

    sync(&source, &registry, "c0", "c1");

    let tables = registry.store().list_tables().unwrap();
    assert_eq!(tables, vec![TableName::from("index")]);
    let items = registry.store().items(&TableName::from("index"));
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].file_name, "index");
    assert_eq!(items[0].folder_name, "template");
    assert_eq!(items[0].function_names.joined(), "orderProcessor");
}

#[test]
fn removed_resource_unregisters_its_function() {
    init_logging();
    let mut source = MemorySource::new();
    source
        .add_commit("orders", "c0", &[], &[])
        .add_commit("orders", "c1", &["c0"], &[("service/template.yaml", ORDER_TEMPLATE)])
        .add_commit(
            "orders",
            "c2",
            &["c1"],
            &[("service/template.yaml", "Resources: {}\n")],
        );
    let registry = registry();

    sync(&source, &registry, "c0", "c1");
    sync(&source, &registry, "c1", "c2");

    let table = TableName::from("index");
    assert!(!registry.function_exists(&table, "index", "orderProcessor").unwrap());
    assert!(registry.item_exists(&table, "index").unwrap());
}

#[test]
fn deleted_template_unregisters_its_function() {
    init_logging();
    let mut source = MemorySource::new();
    source
        .add_commit("orders", "c0", &[], &[])
        .add_commit("orders", "c1", &["c0"], &[("service/template.yaml", ORDER_TEMPLATE)])
        .add_commit("orders", "c2", &["c1"], &[]);
    let registry = registry();

    sync(&source, &registry, "c0", "c1");
    sync(&source, &registry, "c1", "c2");

    assert_eq!(index_functions(&registry), "");
}

#[test]
fn resource_without_handler_creates_nothing() {
    init_logging();
    let mut source = MemorySource::new();
    source
        .add_commit("orders", "c0", &[], &[])
        .add_commit("orders", "c1", &["c0"], &[("queue.yaml", NO_HANDLER_TEMPLATE)]);
    let registry = registry();

    sync(&source, &registry, "c0", "c1");

    assert!(registry.store().list_tables().unwrap().is_empty());
}

#[test]
fn applying_the_same_change_twice_does_not_duplicate() {
    init_logging();
    let mut source = MemorySource::new();
    source
        .add_commit("orders", "c0", &[], &[])
        .add_commit("orders", "c1", &["c0"], &[("service/template.yaml", ORDER_TEMPLATE)]);
    let registry = registry();
    let revisions = Revisions::Range {
        before: Some("c0".into()),
        after: "c1".into(),
    };

    let config = Config::default();
    let first = pipeline::run(&source, &registry, &config, "orders", &revisions).unwrap();
    let second = pipeline::run(&source, &registry, &config, "orders", &revisions).unwrap();

    assert_eq!(first.report.registrations[0].action, AddAction::TableCreated);
    assert_eq!(second.report.registrations[0].action, AddAction::AlreadyPresent);
    assert_eq!(index_functions(&registry), "orderProcessor");
}

#[test]
fn second_template_with_same_module_extends_the_item() {
    init_logging();
    let mut source = MemorySource::new();
    source
        .add_commit("orders", "c0", &[], &[])
        .add_commit("orders", "c1", &["c0"], &[("service/template.yaml", ORDER_TEMPLATE)])
        .add_commit(
            "orders",
            "c2",
            &["c1"],
            &[
                ("service/template.yaml", ORDER_TEMPLATE),
                ("bugs/bugs.yml", BUGS_TEMPLATE),
            ],
        );
    let registry = registry();

    sync(&source, &registry, "c0", "c1");
    sync(&source, &registry, "c1", "c2");

    assert_eq!(index_functions(&registry), "orderProcessor,listBugs");
}

#[test]
fn removal_strips_the_name_from_every_table() {
    init_logging();
    let registry = registry();
    for module in ["index", "app", "worker"] {
        let table = TableName::from(module);
        registry.create_table(&table).unwrap();
        registry.wait_until_ready(&table).unwrap();
        registry.create_item(&table, module, "template", "shared").unwrap();
    }
    registry
        .add_function_to_item(&TableName::from("app"), "app", "other")
        .unwrap();

    let mut source = MemorySource::new();
    source
        .add_commit("orders", "c0", &[], &[("t.yaml", "FunctionName: shared\n")])
        .add_commit("orders", "c1", &["c0"], &[]);
    sync(&source, &registry, "c0", "c1");

    for module in ["index", "app", "worker"] {
        let table = TableName::from(module);
        assert!(!registry.function_exists(&table, module, "shared").unwrap());
    }
    assert!(registry
        .function_exists(&TableName::from("app"), "app", "other")
        .unwrap());
}

#[test]
fn trigger_event_drives_a_full_invocation() {
    init_logging();
    let mut source = MemorySource::new();
    source
        .add_commit("orders", "c0", &[], &[])
        .add_commit("orders", "c1", &["c0"], &[("service/template.yaml", ORDER_TEMPLATE)]);
    let registry = registry();
    let event = r#"{"Records":[{"awsRegion":"us-east-1",
        "eventSourceARN":"arn:aws:codecommit:us-east-1:123456789012:orders",
        "codecommit":{"references":[{"ref":"refs/heads/main","commit":"c1"}]}}]}"#;

    let result = handle_event_json(&source, &registry, &Config::default(), event);

    assert_eq!(result.status_code, 200, "{}", result.body);
    assert!(result.body.starts_with("Operation completed successfully"));
    assert!(result.body.contains("1 registered"));
    assert_eq!(index_functions(&registry), "orderProcessor");
}

#[test]
fn malformed_trigger_event_is_a_500() {
    init_logging();
    let source = MemorySource::new();
    let registry = registry();
    let result = handle_event_json(&source, &registry, &Config::default(), r#"{"Records":[]}"#);
    assert_eq!(result.status_code, 500);
}
