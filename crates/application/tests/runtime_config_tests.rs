use application::build_runtime;
use domain::{AccessRights, DataType, TagKind};
use infrastructure::RuntimeConfig;
use serde_json::json;

const PROJECT: &str = r#"
[target]
model = "Panel PP886H"

[features]
fast_logging = true

[[poll_groups]]
name = "Fast"
interval_ms = 50

[[triggers]]
name = "Slow"
interval_ms = 1000

[[controllers]]
name = "PLC1"

[[controllers.registers]]
item = "DB1.DBW0"
value = 12

[[controllers]]
name = "PLC2"

[[tags]]
name = "Tank.Level"
data_type = "Int16"
offset = 50.5
poll_group = "Fast"
trigger = "Slow"
log_to_audit_trail = true

[[tags.items]]
controller = "PLC1"
item = "DB1.DBW0"
access = "Read"

[[tags.items]]
controller = "PLC2"
item = "DB2.DBW0"
access = "Write"

[[tags]]
name = "Recipe.Step"
data_type = "Int32"
initial_value = 3
"#;

fn config(model: &str, fast_logging: bool) -> RuntimeConfig {
    let mut config = RuntimeConfig::from_toml_str(PROJECT).unwrap();
    config.target.model = model.to_string();
    config.features.fast_logging = fast_logging;
    config
}

#[test] // builds_controllers_and_tags_from_configuration
fn builds_controllers_and_tags_from_configuration() {
    let runtime = build_runtime(&config("Panel PP886H", true)).unwrap();
    let global = &runtime.controller;

    assert_eq!(runtime.devices.len(), 2);
    assert_eq!(global.tag_count(), 2);
    assert_eq!(runtime.counter.count(), 1);

    let level = global.tag("Tank.Level").unwrap();
    assert_eq!(level.kind(), TagKind::Connected);
    assert_eq!(level.offset(), 50.5);
    assert_eq!(level.access_rights_for("PLC1"), AccessRights::Read);
    assert_eq!(level.poll_group().unwrap().interval_ms(), 50);
    assert!(!level.trigger().unwrap().is_immediate());

    let step = global.tag("Recipe.Step").unwrap();
    assert_eq!(step.kind(), TagKind::Internal);
    assert_eq!(step.data_type(), DataType::Int32);
    assert_eq!(step.value().value, json!(3));
}

#[test] // fast_poll_interval_depends_on_target_model
fn fast_poll_interval_depends_on_target_model() {
    let err = build_runtime(&config("Panel PP886M", true)).err().unwrap();
    assert!(format!("{err:#}").contains("Poll group Fast"));

    assert!(build_runtime(&config("Panel PP886H", false)).is_err());
    assert!(build_runtime(&config("Panel PP886H", true)).is_ok());
}

#[test] // unknown_references_are_reported
fn unknown_references_are_reported() {
    let mut config = config("Panel PP886H", true);
    config.tags[0].items[0].controller = "PLC9".into();

    let err = build_runtime(&config).err().unwrap();

    assert!(format!("{err:#}").contains("unknown controller PLC9"));
}

#[tokio::test] // poll_sweep_reads_configured_registers
async fn poll_sweep_reads_configured_registers() {
    let runtime = build_runtime(&config("Panel PP886H", true)).unwrap();
    let global = &runtime.controller;
    let level = global.tag("Tank.Level").unwrap();

    application::TriggerScheduler::read_sweep(&global.batch_service(), &[level.clone()]).await;

    // Register 12 plus the offset, rounded half to even.
    assert_eq!(level.value().value, json!(62));
    assert_eq!(runtime.devices[0].batch_commit_count(), 1);

    // The slow trigger holds the value back until its next sweep.
    assert!(runtime.devices[1].writes("DB2.DBW0").is_empty());
    assert_eq!(level.exchange_pending(), 1);
    assert_eq!(runtime.devices[1].register("DB2.DBW0"), Some(json!(12)));
}
