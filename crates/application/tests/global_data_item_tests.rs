use std::sync::Arc;

use application::tag::{ActionBounds, GlobalDataItem, TagAction, TagServices};
use application::DataTrigger;
use domain::service::{AuditTrailService, DataItemCountingService};
use domain::{AccessRights, ActiveState, DataQuality, DataType, DomainError, TagEvent, TagKind, TagName};
use infrastructure::MemoryController;
use mockall::mock;
use mockall::predicate::eq;
use parking_lot::Mutex;
use serde_json::{Value, json};

// --- Service Mocks ---

mock! {
    Counting {}
    impl DataItemCountingService for Counting {
        fn add_connected_data_items(&self, count: usize);
        fn remove_connected_data_items(&self, count: usize);
    }
}

mock! {
    Audit {}
    impl AuditTrailService for Audit {
        fn log_data_item_changed(&self, tag_name: &str, old_value: &Value, new_value: &Value);
    }
}

fn tag(name: &str, data_type: DataType) -> Arc<GlobalDataItem> {
    GlobalDataItem::new(TagName::new(name).unwrap(), data_type)
}

fn record(tag: &GlobalDataItem) -> Arc<Mutex<Vec<TagEvent>>> {
    let events = Arc::new(Mutex::new(Vec::new()));
    let sink = events.clone();
    tag.subscribe(move |e| sink.lock().push(e.clone()));
    events
}

fn count(events: &Mutex<Vec<TagEvent>>, event_type: &str) -> usize {
    events
        .lock()
        .iter()
        .filter(|e| e.event_type() == event_type)
        .count()
}

#[test] // read_change_writes_each_writable_sibling_once
fn read_change_writes_each_writable_sibling_once() {
    let plc1 = MemoryController::new("PLC1");
    let plc2 = MemoryController::new("PLC2");
    let plc3 = MemoryController::new("PLC3");
    let level = tag("Tank.Level", DataType::Int16);
    level
        .add_data_item(0, plc1.add_data_item("A", DataType::Int16), AccessRights::Read, false)
        .unwrap();
    level
        .add_data_item(0, plc2.add_data_item("B", DataType::Int16), AccessRights::Write, false)
        .unwrap();
    level
        .add_data_item(0, plc3.add_data_item("C", DataType::Int16), AccessRights::ReadWrite, false)
        .unwrap();

    plc1.set_device_value("A", json!(5));

    assert_eq!(plc2.writes("B").len(), 1);
    assert_eq!(plc2.writes("B")[0].value, json!(5));
    assert_eq!(plc3.writes("C").len(), 1);
    assert!(plc1.writes("A").is_empty());
    assert_eq!(level.value().value, json!(5));
}

#[test] // read_write_source_is_never_written_back
fn read_write_source_is_never_written_back() {
    let plc1 = MemoryController::new("PLC1");
    let plc2 = MemoryController::new("PLC2");
    let speed = tag("Line.Speed", DataType::Int32);
    speed
        .add_data_item(0, plc1.add_data_item("A", DataType::Int32), AccessRights::ReadWrite, false)
        .unwrap();
    speed
        .add_data_item(0, plc2.add_data_item("B", DataType::Int32), AccessRights::Write, false)
        .unwrap();

    plc1.set_device_value("A", json!(1200));
    plc1.set_device_value("A", json!(1200));

    assert!(plc1.writes("A").is_empty());
    assert_eq!(plc2.writes("B").len(), 1);
}

#[test] // write_only_tag_returns_last_write
fn write_only_tag_returns_last_write() {
    let plc = MemoryController::new("PLC1");
    let setpoint = tag("Setpoint", DataType::Int16);
    setpoint
        .add_data_item(0, plc.add_data_item("A", DataType::Int16), AccessRights::Write, false)
        .unwrap();
    let events = record(&setpoint);

    setpoint.set_value(json!(7)).unwrap();
    assert_eq!(setpoint.value().value, json!(7));
    setpoint.set_value(json!(9)).unwrap();
    assert_eq!(setpoint.value().value, json!(9));

    assert_eq!(plc.writes("A").len(), 2);
    assert_eq!(count(&events, "ValueChanged"), 2);
}

#[test] // data_exchange_write_raises_value_change_only_on_change
fn data_exchange_write_raises_value_change_only_on_change() {
    let plc = MemoryController::new("PLC1");
    let setpoint = tag("Setpoint", DataType::Int16);
    setpoint
        .add_data_item(0, plc.add_data_item("A", DataType::Int16), AccessRights::Write, false)
        .unwrap();
    setpoint.set_value(json!(4)).unwrap();
    let events = record(&setpoint);

    setpoint.batch_write_for_data_exchange(json!(4));
    assert_eq!(count(&events, "ValueChanged"), 0);

    setpoint.batch_write_for_data_exchange(json!(6));
    assert_eq!(count(&events, "ValueChanged"), 1);
    assert_eq!(count(&events, "AccessDenied"), 0);
}

#[test] // data_exchange_write_raises_value_change_once_for_many_items
fn data_exchange_write_raises_value_change_once_for_many_items() {
    let plcs = [
        MemoryController::new("PLC1"),
        MemoryController::new("PLC2"),
        MemoryController::new("PLC3"),
    ];
    let setpoint = tag("Setpoint", DataType::Int16);
    for plc in &plcs {
        setpoint
            .add_data_item(0, plc.add_data_item("A", DataType::Int16), AccessRights::Write, false)
            .unwrap();
    }
    setpoint.set_value(json!(4)).unwrap();
    let events = record(&setpoint);

    setpoint.batch_write_for_data_exchange(json!(4));
    assert_eq!(count(&events, "ValueChanged"), 0);

    setpoint.batch_write_for_data_exchange(json!(6));
    assert_eq!(count(&events, "ValueChanged"), 1);
    for plc in &plcs {
        assert_eq!(plc.register("A"), Some(json!(6)));
    }
}

#[test] // internal_variable_raises_value_change_on_set
fn internal_variable_raises_value_change_on_set() {
    let counter = tag("Batch.Counter", DataType::Int32);
    let events = record(&counter);

    counter.set_value(json!(3)).unwrap();
    counter.set_value(json!(3)).unwrap();

    assert_eq!(counter.kind(), TagKind::Internal);
    assert_eq!(counter.value().value, json!(3));
    assert_eq!(count(&events, "ValueChanged"), 1);
    assert_eq!(count(&events, "ValueOn"), 1);
}

#[test] // int16_offset_rounds_half_to_even
fn int16_offset_rounds_half_to_even() {
    let plc = MemoryController::new("PLC1");
    let level = tag("Tank.Level", DataType::Int16);
    level
        .add_data_item(0, plc.add_data_item("A", DataType::Int16), AccessRights::Write, false)
        .unwrap();
    level.set_offset(50.5).unwrap();

    level.set_value(json!(100)).unwrap();

    assert_eq!(plc.register("A"), Some(json!(50)));
    assert_eq!(level.sub_item(0).unwrap().internal_value().value, json!(50));
    assert_eq!(level.value().value, json!(100));
}

#[test] // invalid_scaling_is_rejected
fn invalid_scaling_is_rejected() {
    let level = tag("Tank.Level", DataType::Double);
    assert!(level.set_gain(0.0).unwrap_err().is_argument_error());
    assert!(level.set_offset(f64::NAN).is_err());
    assert_eq!(level.gain(), 1.0);
    assert_eq!(level.offset(), 0.0);
}

#[test] // read_only_tag_denies_operator_writes
fn read_only_tag_denies_operator_writes() {
    let plc = MemoryController::new("PLC1");
    let alarm = tag("Alarm.Active", DataType::Bit);
    alarm
        .add_data_item(0, plc.add_data_item("M0", DataType::Bit), AccessRights::ReadWrite, false)
        .unwrap();
    alarm.set_access_right(AccessRights::Read);
    let events = record(&alarm);

    alarm.set_value(json!(true)).unwrap();
    assert!(!alarm.batch_write(json!(true)));
    assert!(!alarm.execute(&TagAction::ToggleTag));

    assert_eq!(count(&events, "AccessDenied"), 3);
    assert_eq!(plc.write_count(), 0);
}

#[test] // batch_write_reaches_items_without_access
fn batch_write_reaches_items_without_access() {
    let plc1 = MemoryController::new("PLC1");
    let plc2 = MemoryController::new("PLC2");
    let mode = tag("Mode", DataType::Int16);
    mode.add_data_item(0, plc1.add_data_item("A", DataType::Int16), AccessRights::None, false)
        .unwrap();
    mode.add_data_item(0, plc2.add_data_item("B", DataType::Int16), AccessRights::Read, false)
        .unwrap();

    assert!(mode.batch_write(json!(2)));
    mode.batch_write_for_data_exchange(json!(3));

    let writes = plc1.writes("A");
    assert_eq!(writes.len(), 1);
    assert_eq!(writes[0].value, json!(2));
    assert!(plc2.writes("B").is_empty());
}

#[test] // increment_action_writes_each_constituent_and_audits_once
fn increment_action_writes_each_constituent_and_audits_once() {
    let plc1 = MemoryController::new("PLC1");
    let plc2 = MemoryController::new("PLC2");
    let level = tag("Tank.Level", DataType::Int16);
    level
        .add_data_item(0, plc1.add_data_item("A", DataType::Int16), AccessRights::ReadWrite, false)
        .unwrap();
    level
        .add_data_item(0, plc2.add_data_item("B", DataType::Int16), AccessRights::Write, false)
        .unwrap();
    level.set_log_to_audit_trail(true);

    let mut audit = MockAudit::new();
    audit
        .expect_log_data_item_changed()
        .withf(|name, old, new| name == "Tank.Level" && old == &json!(10) && new == &json!(12))
        .times(1)
        .return_const(());
    level.attach_services(TagServices {
        counting: None,
        audit: Some(Arc::new(audit)),
    });
    plc1.set_device_value("A", json!(10));
    plc2.set_device_value("B", json!(10));

    let action = TagAction::Increment {
        amount: 5.0,
        bounds: Some(ActionBounds::new(0.0, 12.0).unwrap()),
    };
    assert!(level.execute(&action));

    assert_eq!(plc1.register("A"), Some(json!(12)));
    assert_eq!(plc2.register("B"), Some(json!(12)));
}

#[test] // increment_on_write_only_tag_starts_from_last_write
fn increment_on_write_only_tag_starts_from_last_write() {
    let plc = MemoryController::new("PLC1");
    let setpoint = tag("Setpoint", DataType::Int16);
    setpoint
        .add_data_item(0, plc.add_data_item("A", DataType::Int16), AccessRights::Write, false)
        .unwrap();
    setpoint.set_log_to_audit_trail(true);

    let mut audit = MockAudit::new();
    audit
        .expect_log_data_item_changed()
        .withf(|name, old, new| name == "Setpoint" && old == &json!(7) && new == &json!(8))
        .times(1)
        .return_const(());
    setpoint.attach_services(TagServices {
        counting: None,
        audit: Some(Arc::new(audit)),
    });

    setpoint.set_value(json!(7)).unwrap();
    assert!(setpoint.execute(&TagAction::Increment {
        amount: 1.0,
        bounds: None,
    }));

    assert_eq!(plc.register("A"), Some(json!(8)));
    assert_eq!(setpoint.value().value, json!(8));
}

#[test] // toggle_action_flips_bit
fn toggle_action_flips_bit() {
    let pump = tag("Pump.Run", DataType::Bit);
    let events = record(&pump);

    assert!(pump.execute(&TagAction::ToggleTag));
    assert_eq!(pump.value().value, json!(true));
    assert!(pump.execute(&TagAction::ToggleTag));
    assert_eq!(pump.value().value, json!(false));

    assert_eq!(count(&events, "ValueOn"), 1);
    assert_eq!(count(&events, "ValueOff"), 1);
}

#[test] // dispose_decrements_count_once_and_removes_every_item
fn dispose_decrements_count_once_and_removes_every_item() {
    let plc1 = MemoryController::new("PLC1");
    let plc2 = MemoryController::new("PLC2");
    let plc3 = MemoryController::new("PLC3");
    let level = tag("Tank.Level", DataType::Int16);
    for (plc, access) in [
        (&plc1, AccessRights::Read),
        (&plc2, AccessRights::Write),
        (&plc3, AccessRights::ReadWrite),
    ] {
        level
            .add_data_item(0, plc.add_data_item("A", DataType::Int16), access, false)
            .unwrap();
    }

    let mut counting = MockCounting::new();
    counting
        .expect_add_connected_data_items()
        .with(eq(1))
        .times(1)
        .return_const(());
    counting
        .expect_remove_connected_data_items()
        .with(eq(1))
        .times(1)
        .return_const(());
    level.attach_services(TagServices {
        counting: Some(Arc::new(counting)),
        audit: None,
    });

    level.dispose();
    level.dispose();

    assert!(level.is_disposed());
    assert_eq!(level.constituent_count(), 0);
    for plc in [&plc1, &plc2, &plc3] {
        assert_eq!(plc.removed_count(), 1);
        assert!(plc.data_items().is_empty());
    }
}

#[test] // duplicate_controller_in_slot_is_rejected
fn duplicate_controller_in_slot_is_rejected() {
    let plc = MemoryController::new("PLC1");
    let level = tag("Tank.Level", DataType::Int16);
    level
        .add_data_item(0, plc.add_data_item("A", DataType::Int16), AccessRights::Read, false)
        .unwrap();

    let err = level
        .add_data_item(0, plc.add_data_item("B", DataType::Int16), AccessRights::Read, false)
        .unwrap_err();

    assert_eq!(err, DomainError::DuplicateKey("PLC1".into()));
    assert_eq!(level.constituent_count(), 1);
}

#[test] // activation_polls_single_reader_with_writable_sibling
fn activation_polls_single_reader_with_writable_sibling() {
    let plc1 = MemoryController::new("PLC1");
    let plc2 = MemoryController::new("PLC2");
    let source = plc1.add_data_item("A", DataType::Int16);
    let target = plc2.add_data_item("B", DataType::Int16);
    let level = tag("Tank.Level", DataType::Int16);
    level.add_data_item(0, source.clone(), AccessRights::Read, false).unwrap();
    level.add_data_item(0, target.clone(), AccessRights::Write, false).unwrap();

    level.run();

    assert_eq!(source.active_state(), ActiveState::Active);
    assert_eq!(target.active_state(), ActiveState::Inactive);

    let writers_only = tag("Setpoint", DataType::Int16);
    let item = plc1.add_data_item("C", DataType::Int16);
    writers_only.add_data_item(0, item.clone(), AccessRights::Write, false).unwrap();
    writers_only.run();
    assert_eq!(item.active_state(), ActiveState::Inactive);
}

#[test] // scheduled_trigger_defers_exchange
fn scheduled_trigger_defers_exchange() {
    let plc1 = MemoryController::new("PLC1");
    let plc2 = MemoryController::new("PLC2");
    let level = tag("Tank.Level", DataType::Int16);
    level
        .add_data_item(0, plc1.add_data_item("A", DataType::Int16), AccessRights::Read, false)
        .unwrap();
    level
        .add_data_item(0, plc2.add_data_item("B", DataType::Int16), AccessRights::Write, false)
        .unwrap();
    level.set_trigger(Some(DataTrigger::scheduled(
        "Slow",
        std::time::Duration::from_secs(1),
    )));
    let events = record(&level);

    plc1.set_device_value("A", json!(8));

    assert!(plc2.writes("B").is_empty());
    assert_eq!(count(&events, "ValueChanged"), 1);
    assert_eq!(level.sub_item(0).unwrap().trigger_value().value, json!(8));

    assert_eq!(level.exchange_pending(), 1);
    assert_eq!(level.exchange_pending(), 0);
    assert_eq!(plc2.writes("B")[0].value, json!(8));
}

#[test] // string_and_date_time_tags_raise_no_value_on_or_off
fn string_and_date_time_tags_raise_no_value_on_or_off() {
    let plc = MemoryController::new("PLC1");
    let batch_id = tag("Batch.Id", DataType::String);
    batch_id
        .add_data_item(0, plc.add_data_item("S", DataType::String), AccessRights::Read, false)
        .unwrap();
    let started = tag("Batch.Started", DataType::DateTime);
    let batch_events = record(&batch_id);
    let started_events = record(&started);

    plc.set_device_value("S", json!("1"));
    plc.set_device_value("S", json!("0"));
    plc.set_device_value("S", json!(""));
    started.set_value(json!("2026-03-01T06:00:00+00:00")).unwrap();
    started.set_value(DataType::DateTime.default_value()).unwrap();

    for events in [&batch_events, &started_events] {
        assert!(count(events, "ValueChanged") >= 2);
        assert_eq!(count(events, "ValueOn"), 0);
        assert_eq!(count(events, "ValueOff"), 0);
    }
}

#[test] // write_only_tag_quality_follows_last_write
fn write_only_tag_quality_follows_last_write() {
    let plc = MemoryController::new("PLC1");
    let setpoint = tag("Setpoint", DataType::Int16);
    setpoint
        .add_data_item(0, plc.add_data_item("A", DataType::Int16), AccessRights::Write, false)
        .unwrap();

    setpoint.set_value(json!(7)).unwrap();
    assert_eq!(setpoint.value().quality, DataQuality::Good);
    assert_eq!(setpoint.quality(), DataQuality::Good);

    plc.set_connected(false);
    setpoint.set_value(json!(8)).unwrap();
    assert_eq!(setpoint.quality(), DataQuality::Bad);
}

#[test] // quality_loss_raises_no_value_change
fn quality_loss_raises_no_value_change() {
    let plc = MemoryController::new("PLC1");
    let level = tag("Tank.Level", DataType::Int16);
    level
        .add_data_item(0, plc.add_data_item("A", DataType::Int16), AccessRights::Read, false)
        .unwrap();
    plc.set_device_value("A", json!(3));
    assert_eq!(level.quality(), DataQuality::Good);
    let events = record(&level);

    plc.set_connected(false);
    level.batch_read();

    assert_eq!(level.quality(), DataQuality::Bad);
    assert_eq!(count(&events, "QualityChanged"), 1);
    assert_eq!(count(&events, "ValueChanged"), 0);
    assert_eq!(level.value().value, json!(3));
}

#[test] // array_tag_is_addressed_by_index
fn array_tag_is_addressed_by_index() {
    let recipe = GlobalDataItem::new_array(TagName::new("Recipe").unwrap(), DataType::Int16, 3)
        .unwrap();

    assert_eq!(recipe.kind(), TagKind::Array);
    assert_eq!(recipe.value().quality, DataQuality::Unknown);
    assert!(matches!(
        recipe.set_value(json!(1)),
        Err(DomainError::InvalidOperation(_))
    ));

    recipe.set_value_at(1, json!(4)).unwrap();
    assert_eq!(recipe.value_at(1).unwrap().value, json!(4));
    assert_eq!(recipe.value_at(0).unwrap().value, json!(0));
    assert!(recipe.value_at(3).is_err());
    assert!(GlobalDataItem::new_array(TagName::new("Empty").unwrap(), DataType::Int16, 0).is_err());
}

#[test] // array_tag_rejects_unindexed_batch_writes_and_actions
fn array_tag_rejects_unindexed_batch_writes_and_actions() {
    let plc = MemoryController::new("PLC1");
    let recipe = GlobalDataItem::new_array(TagName::new("Recipe").unwrap(), DataType::Int16, 3)
        .unwrap();
    recipe
        .add_data_item(0, plc.add_data_item("R0", DataType::Int16), AccessRights::Write, false)
        .unwrap();

    assert!(!recipe.batch_write(json!(5)));
    recipe.batch_write_for_data_exchange(json!(6));
    assert!(!recipe.execute(&TagAction::SetAnalog { value: 9.0 }));

    assert_eq!(plc.write_count(), 0);
    assert_eq!(recipe.value_at(0).unwrap().value, json!(0));

    recipe.set_value_at(0, json!(9)).unwrap();
    assert_eq!(plc.register("R0"), Some(json!(9)));
}
