//! Integration tests for skin activation, deferred teardown and refresh
//!
//! These tests verify:
//! - Activation is idempotent and replaces other variants of the same config
//! - Missing variant files leave the config inactive with a notice
//! - Instances deactivated from their own commands are destroyed at the safe point
//! - RefreshAll reconciles running instances with a fresh scan

mod common;

use common::{Fixture, ShellCall, section_value};
use skinhost::host::{ActivationOutcome, DeactivationOutcome, Divergence, UserNotice};
use skinhost::instance::InstanceAction;
use skinhost::instance::headless::JournalEntry;
use skinhost::state::HostEvent;
use std::fs;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};

fn created(journal: &[JournalEntry], config: &str) -> usize {
    journal
        .iter()
        .filter(|e| matches!(e, JournalEntry::Created { config: c, .. } if c == config))
        .count()
}

fn destroyed(journal: &[JournalEntry], config: &str) -> usize {
    journal
        .iter()
        .filter(|e| matches!(e, JournalEntry::Destroyed { config: c } if c == config))
        .count()
}

#[test]
fn test_activate_same_variant_twice_is_a_no_op() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    let (mut host, journal, _shell) = fixture.host();

    assert_eq!(host.activate(0, 0), ActivationOutcome::Activated);
    assert_eq!(
        section_value(&fixture.read_settings(), "Clock", "Active").as_deref(),
        Some("1")
    );

    // An outside edit survives: the second call must not write anything
    let edited = "[Rainmeter]\n\n[Clock]\nActive=1\nLoadOrder=3\n";
    fixture.write_settings(edited);

    assert_eq!(host.activate(0, 0), ActivationOutcome::AlreadyActive);
    assert_eq!(fixture.read_settings(), edited);
    assert_eq!(created(&journal.entries(), "Clock"), 1);
    assert_eq!(host.running_names(), vec!["Clock"]);
}

#[test]
fn test_switching_variant_replaces_the_instance() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Analog.ini", "[Rainmeter]\n");
    fixture.add_skin("Clock", "Digital.ini", "[Rainmeter]\n");
    let (mut host, journal, _shell) = fixture.host();

    assert_eq!(host.activate(0, 0), ActivationOutcome::Activated);
    assert_eq!(host.activate(0, 1), ActivationOutcome::Activated);

    let running = host.running("clock").unwrap();
    assert_eq!(running.variant, "Digital.ini");
    assert_eq!(host.running_names().len(), 1);
    assert_eq!(host.registry().config(0).unwrap().active, 2);

    let entries = journal.entries();
    assert_eq!(
        entries,
        vec![
            JournalEntry::Created {
                config: "Clock".into(),
                variant: "Analog.ini".into()
            },
            JournalEntry::Destroyed {
                config: "Clock".into()
            },
            JournalEntry::Created {
                config: "Clock".into(),
                variant: "Digital.ini".into()
            },
        ]
    );
    assert_eq!(
        section_value(&fixture.read_settings(), "Clock", "Active").as_deref(),
        Some("2")
    );
}

#[test]
fn test_missing_variant_file_leaves_config_inactive() {
    let fixture = Fixture::new();
    let file = fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    let (mut host, journal, shell) = fixture.host();

    fs::remove_file(&file).unwrap();

    assert_eq!(host.activate(0, 0), ActivationOutcome::FileMissing);
    assert!(!host.is_running("Clock"));
    assert_eq!(host.registry().config(0).unwrap().active, 0);
    assert!(journal.entries().is_empty());
    assert_eq!(
        shell.notices(),
        vec![UserNotice::UnableToActivate {
            config: "Clock".into(),
            file: "Clock.ini".into()
        }]
    );
}

#[test]
fn test_invalid_indices_are_rejected() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    let (mut host, _journal, _shell) = fixture.host();

    assert_eq!(host.activate(0, 5), ActivationOutcome::InvalidIndex);
    assert_eq!(host.activate(9, 0), ActivationOutcome::InvalidIndex);
    assert_eq!(
        host.activate_by_name("Clock", "Other.ini"),
        ActivationOutcome::InvalidIndex
    );
}

#[test]
fn test_deactivate_persists_zero() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    let (mut host, journal, _shell) = fixture.host();

    host.activate(0, 0);
    assert_eq!(host.deactivate("CLOCK", true), DeactivationOutcome::Destroyed);
    assert_eq!(host.deactivate("Clock", true), DeactivationOutcome::NotRunning);

    assert_eq!(destroyed(&journal.entries(), "Clock"), 1);
    assert_eq!(
        section_value(&fixture.read_settings(), "Clock", "Active").as_deref(),
        Some("0")
    );
}

#[test]
fn test_startup_activates_in_load_order() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    fixture.add_skin("Notes", "Notes.ini", "[Rainmeter]\n");
    fixture.add_skin("Weather", "Weather.ini", "[Rainmeter]\n");
    fixture.write_settings(
        "[Rainmeter]\n\n\
         [Clock]\nActive=1\nLoadOrder=5\n\n\
         [Notes]\nActive=1\nLoadOrder=-1\n\n\
         [Weather]\nActive=2\n",
    );

    let (host, journal, _shell) = fixture.host();

    let order: Vec<String> = journal
        .entries()
        .into_iter()
        .filter_map(|e| match e {
            JournalEntry::Created { config, .. } => Some(config),
            _ => None,
        })
        .collect();
    // Weather's selection is out of range and is ignored
    assert_eq!(order, vec!["Notes", "Clock"]);
    assert!(!host.is_running("Weather"));
}

#[test]
fn test_self_deactivation_is_deferred_until_pump() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    let (mut host, journal, _shell) = fixture.host();

    host.activate(0, 0);
    let id = host.running("Clock").unwrap().id;

    host.execute_command("!DeactivateConfig Clock", Some(id))
        .unwrap();

    assert!(host.is_running("Clock"));
    assert!(host.running("Clock").unwrap().is_pending());
    assert_eq!(host.registry().configs()[0].active, 0);
    assert_eq!(host.pending_teardown_len(), 1);
    assert_eq!(destroyed(&journal.entries(), "Clock"), 0);
    assert_eq!(
        journal.bangs_for("Clock"),
        vec![(InstanceAction::HideFade, String::new())]
    );

    host.pump();

    assert!(!host.is_running("Clock"));
    assert_eq!(host.pending_teardown_len(), 0);
    assert_eq!(destroyed(&journal.entries(), "Clock"), 1);
    assert_eq!(host.metrics().deferred_teardowns.load(Ordering::Relaxed), 1);

    // Draining again destroys nothing twice
    host.pump();
    assert_eq!(destroyed(&journal.entries(), "Clock"), 1);
}

#[test]
fn test_batch_keeps_issuer_context_after_self_deactivation() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Variables]\nM=42\n");
    let (mut host, journal, shell) = fixture.host();

    host.activate(0, 0);
    let id = host.running("Clock").unwrap().id;

    host.execute_command("!Execute [!DeactivateConfig Clock][notify [M]]", Some(id))
        .unwrap();

    assert_eq!(shell.calls(), vec![ShellCall::Run("notify 42".into())]);
    assert_eq!(host.pending_teardown_len(), 1);

    host.pump();
    assert!(!host.is_running("Clock"));
    assert_eq!(destroyed(&journal.entries(), "Clock"), 1);
}

#[test]
fn test_reactivation_while_pending_takes_over_the_config() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    let (mut host, journal, _shell) = fixture.host();

    host.activate(0, 0);
    let id = host.running("Clock").unwrap().id;

    host.execute_command(
        "!Execute [!DeactivateConfig Clock][!ActivateConfig Clock Clock.ini]",
        Some(id),
    )
    .unwrap();

    let running = host.running("Clock").unwrap();
    assert_ne!(running.id, id);
    assert!(!running.is_pending());
    assert_eq!(created(&journal.entries(), "Clock"), 2);
    assert_eq!(host.pending_teardown_len(), 1);
    assert_eq!(section_value(&fixture.read_settings(), "Clock", "Active").as_deref(), Some("1"));

    host.pump();
    assert_eq!(destroyed(&journal.entries(), "Clock"), 1);
    assert!(host.is_running("Clock"));
    assert_eq!(host.pending_teardown_len(), 0);
}

#[test]
fn test_toggle_while_pending_activates_again() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    let (mut host, _journal, _shell) = fixture.host();

    host.activate(0, 0);
    let id = host.running("Clock").unwrap().id;

    host.execute_command(
        "!Execute [!DeactivateConfig Clock][!ToggleConfig Clock Clock.ini]",
        Some(id),
    )
    .unwrap();

    assert!(!host.running("Clock").unwrap().is_pending());
    assert_eq!(host.registry().configs()[0].active, 1);
}

#[test]
fn test_self_replacement_keeps_one_running_instance() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Analog.ini", "[Rainmeter]\n");
    fixture.add_skin("Clock", "Digital.ini", "[Rainmeter]\n");
    let (mut host, journal, _shell) = fixture.host();

    host.activate(0, 0);
    let id = host.running("Clock").unwrap().id;

    host.execute_command("!ActivateConfig Clock Digital.ini", Some(id))
        .unwrap();

    assert_eq!(host.running("Clock").unwrap().variant, "Digital.ini");
    assert_eq!(host.running_names().len(), 1);
    assert_eq!(host.pending_teardown_len(), 1);

    host.pump();
    assert_eq!(destroyed(&journal.entries(), "Clock"), 1);
    assert!(host.is_running("Clock"));
}

#[test]
fn test_refresh_all_drops_instance_whose_variant_vanished() {
    let fixture = Fixture::new();
    let analog = fixture.add_skin("Clock", "Analog.ini", "[Rainmeter]\n");
    fixture.add_skin("Clock", "Digital.ini", "[Rainmeter]\n");
    fixture.add_skin("Notes", "Notes.ini", "[Rainmeter]\n");
    let (mut host, journal, shell) = fixture.host();

    host.activate_by_name("Clock", "Analog.ini");
    host.activate_by_name("Notes", "Notes.ini");
    fs::remove_file(&analog).unwrap();

    let report = host.refresh_all();

    assert_eq!(
        report.divergences,
        vec![Divergence::VariantMissing {
            config: "Clock".into(),
            variant: "Analog.ini".into()
        }]
    );
    assert_eq!(report.refreshed, vec!["Notes"]);
    assert!(!host.is_running("Clock"));
    assert!(host.is_running("Notes"));

    let entries = journal.entries();
    assert_eq!(destroyed(&entries, "Clock"), 1);
    assert_eq!(destroyed(&entries, "Notes"), 0);
    assert_eq!(
        shell.notices(),
        vec![UserNotice::UnableToRefresh {
            config: "Clock".into(),
            file: "Analog.ini".into()
        }]
    );
    assert_eq!(
        section_value(&fixture.read_settings(), "Clock", "Active").as_deref(),
        Some("0")
    );
}

#[test]
fn test_refresh_all_drops_instance_whose_config_vanished() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    fixture.add_skin("Notes", "Notes.ini", "[Rainmeter]\n");
    let (mut host, _journal, _shell) = fixture.host();

    host.activate_by_name("Clock", "Clock.ini");
    host.activate_by_name("Notes", "Notes.ini");
    fs::remove_dir_all(fixture.config_dir("Clock")).unwrap();

    let report = host.refresh_all();

    assert_eq!(
        report.divergences,
        vec![Divergence::ConfigMissing {
            config: "Clock".into()
        }]
    );
    assert_eq!(host.running_names(), vec!["Notes"]);
    assert_eq!(host.registry().len(), 1);
}

#[test]
fn test_refresh_all_reindexes_moved_variant_silently() {
    let fixture = Fixture::new();
    let analog = fixture.add_skin("Clock", "Analog.ini", "[Rainmeter]\n");
    fixture.add_skin("Clock", "Digital.ini", "[Rainmeter]\n");
    let (mut host, _journal, shell) = fixture.host();
    let mut events = host.events().subscribe();

    host.activate_by_name("Clock", "Digital.ini");
    assert_eq!(host.registry().config(0).unwrap().active, 2);

    fs::remove_file(&analog).unwrap();
    let report = host.refresh_all();

    assert!(report.divergences.is_empty());
    assert_eq!(report.reindexed, vec!["Clock"]);
    assert_eq!(report.refreshed, vec!["Clock"]);
    assert_eq!(host.running("Clock").unwrap().variant, "Digital.ini");
    assert_eq!(host.registry().config(0).unwrap().active, 1);
    assert!(shell.notices().is_empty());
    assert_eq!(
        section_value(&fixture.read_settings(), "Clock", "Active").as_deref(),
        Some("1")
    );

    let mut reindexed = false;
    while let Ok(event) = events.try_recv() {
        if let HostEvent::VariantReindexed { active, .. } = event {
            assert_eq!(active, 1);
            reindexed = true;
        }
    }
    assert!(reindexed);
}

#[test]
fn test_refresh_all_without_changes_keeps_selections() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Analog.ini", "[Rainmeter]\n");
    fixture.add_skin("Clock", "Digital.ini", "[Rainmeter]\n");
    let (mut host, journal, _shell) = fixture.host();

    host.activate_by_name("Clock", "Digital.ini");
    let report = host.refresh_all();

    assert!(report.reindexed.is_empty());
    assert!(report.divergences.is_empty());
    assert_eq!(host.registry().config(0).unwrap().active, 2);
    assert!(
        journal
            .entries()
            .contains(&JournalEntry::Refreshed {
                config: "Clock".into()
            })
    );
}

#[test]
fn test_refresh_failure_does_not_stop_the_others() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    fixture.add_skin("Notes", "Notes.ini", "[Rainmeter]\n");
    let failing = Arc::new(Mutex::new(vec!["Clock".to_string()]));
    let (mut host, _journal, _shell) = fixture.flaky_host(failing);

    host.activate_by_name("Clock", "Clock.ini");
    host.activate_by_name("Notes", "Notes.ini");

    let report = host.refresh_all();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].0, "Clock");
    assert_eq!(report.refreshed, vec!["Notes"]);
    assert!(host.is_running("Clock"));
    assert!(host.is_running("Notes"));
    assert_eq!(host.metrics().refresh_failures.load(Ordering::Relaxed), 1);
}

#[test]
fn test_refresh_app_runs_at_the_safe_point() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    let (mut host, journal, _shell) = fixture.host();
    host.activate(0, 0);

    host.execute_command("!RefreshApp", None).unwrap();
    assert!(!journal.entries().iter().any(|e| matches!(e, JournalEntry::Refreshed { .. })));

    assert_eq!(host.pump(), 1);
    assert!(journal.entries().iter().any(|e| matches!(e, JournalEntry::Refreshed { .. })));
}

#[test]
fn test_toggle_config() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    let (mut host, _journal, _shell) = fixture.host();

    host.toggle_config("Clock", "Clock.ini");
    assert!(host.is_running("Clock"));
    host.toggle_config("Clock", "Clock.ini");
    assert!(!host.is_running("Clock"));
}

#[test]
fn test_event_bus_reports_lifecycle() {
    let fixture = Fixture::new();
    fixture.add_skin("Clock", "Clock.ini", "[Rainmeter]\n");
    let (mut host, _journal, _shell) = fixture.host();
    let mut events = host.events().subscribe();

    host.activate(0, 0);
    host.deactivate("Clock", false);

    assert_eq!(
        events.try_recv().unwrap(),
        HostEvent::SkinActivated {
            config: "Clock".into(),
            variant: "Clock.ini".into()
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        HostEvent::SkinDeactivated {
            config: "Clock".into(),
            deferred: false
        }
    );
    assert_eq!(
        events.try_recv().unwrap(),
        HostEvent::SkinDestroyed {
            config: "Clock".into()
        }
    );
}
