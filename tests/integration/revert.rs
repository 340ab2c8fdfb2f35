use crate::fixture::{liteos_tree, BOARD, TEMPLATE_ROOT, VENDOR};
use hdf_scaffold::{DriverIdentity, DriverScaffolder, Journal, Kernel, RevertResult, ToolConfig};
use std::fs;

fn bmi160() -> DriverIdentity {
    DriverIdentity::new("sensor", "bmi160", Kernel::Liteos, VENDOR, BOARD, "accel").unwrap()
}

#[test]
fn test_revert_restores_the_tree() {
    let tree = liteos_tree();
    let before = tree.snapshot();
    let config = ToolConfig::default();
    let id = bmi160();

    let report = DriverScaffolder::new(&id, tree.root(), &config)
        .unwrap()
        .run()
        .unwrap();
    let journal_path = report.journal.unwrap();
    assert_ne!(tree.snapshot(), before);

    let journal = Journal::load(&journal_path).unwrap();
    assert_eq!(journal.entries.len(), report.entries.len());
    let results = journal.revert(&tree.guard()).unwrap();

    assert!(results
        .iter()
        .all(|(_, r)| matches!(r, RevertResult::Restored | RevertResult::Removed)));
    let removed: Vec<_> = results
        .iter()
        .filter(|(_, r)| *r == RevertResult::Removed)
        .map(|(p, _)| p.file_name().unwrap().to_string_lossy().into_owned())
        .collect();
    assert_eq!(
        removed,
        vec![
            "hdf_scaffold_settings.toml",
            "accel_bmi160_driver.h",
            "accel_bmi160_driver.c"
        ]
    );
    assert_eq!(tree.snapshot(), before);
}

#[test]
fn test_revert_keeps_hand_edits() {
    let tree = liteos_tree();
    let config = ToolConfig::default();
    let id = bmi160();

    let report = DriverScaffolder::new(&id, tree.root(), &config)
        .unwrap()
        .run()
        .unwrap();
    let kconfig = tree.path("adapter/khdf/liteos/model/sensor/Kconfig");
    let edited = format!("{}# reviewed\n", fs::read_to_string(&kconfig).unwrap());
    fs::write(&kconfig, &edited).unwrap();

    let journal = Journal::load(report.journal.as_ref().unwrap()).unwrap();
    let results = journal.revert(&tree.guard()).unwrap();
    let kconfig_result = results.iter().find(|(p, _)| *p == kconfig).unwrap();
    assert_eq!(kconfig_result.1, RevertResult::Modified);
    assert_eq!(fs::read_to_string(&kconfig).unwrap(), edited);
    assert!(tree
        .read("adapter/khdf/liteos/model/sensor/BUILD.gn")
        .find("BMI160")
        .is_none());
}

#[test]
fn test_rerun_after_partial_add_extends_journal() {
    let tree = liteos_tree();
    let hcs = "vendor/hisilicon/hispark_taurus/hdf_config/device_info.hcs";
    let good_hcs = tree.read(hcs);
    tree.write(hcs, "root {\n}\n");
    let config = ToolConfig::default();
    let id = bmi160();
    let scaffolder = DriverScaffolder::new(&id, tree.root(), &config).unwrap();

    assert!(scaffolder.run().is_err());
    let partial = Journal::load(&scaffolder.journal_path()).unwrap().entries.len();

    tree.write(hcs, &good_hcs);
    scaffolder.run().unwrap();
    let journal = Journal::load(&scaffolder.journal_path()).unwrap();
    assert_eq!(journal.entries.len(), partial + 3);
    assert_eq!(
        journal.entry(&tree.path(hcs)).unwrap().before.as_deref(),
        Some(good_hcs.as_str())
    );
}

#[test]
fn test_revert_leaves_foreign_entries_alone() {
    let tree = liteos_tree();
    let outside = tempfile::tempdir().unwrap();
    let victim = outside.path().join("notes.txt");
    fs::write(&victim, "not part of the tree\n").unwrap();
    let template = tree.path(TEMPLATE_ROOT).join("driver_add_kconfig_config.template");
    let template_text = fs::read_to_string(&template).unwrap();

    let mut journal = Journal::new(&bmi160());
    journal.record(&victim, None).unwrap();
    journal.record(&template, Some(String::new())).unwrap();

    let results = journal.revert(&tree.guard()).unwrap();
    assert!(results.iter().all(|(_, r)| *r == RevertResult::Refused));
    assert_eq!(fs::read_to_string(&victim).unwrap(), "not part of the tree\n");
    assert_eq!(fs::read_to_string(&template).unwrap(), template_text);
}

#[test]
fn test_rerun_reports_content_before_this_run() {
    let tree = liteos_tree();
    let config = ToolConfig::default();
    let id = bmi160();
    let scaffolder = DriverScaffolder::new(&id, tree.root(), &config).unwrap();
    scaffolder.run().unwrap();

    let kconfig = "adapter/khdf/liteos/model/sensor/Kconfig";
    let hand_edited = format!("{}# local\n", crate::fixture::KCONFIG);
    tree.write(kconfig, &hand_edited);

    let report = scaffolder.run().unwrap();
    let applied: Vec<_> = report.applied().collect();
    assert_eq!(applied.len(), 1);
    assert_eq!(applied[0].previous.as_deref(), Some(hand_edited.as_str()));

    // the journal still remembers the tree as it was before the first run
    let journal = Journal::load(&scaffolder.journal_path()).unwrap();
    assert_eq!(
        journal.entry(&tree.path(kconfig)).unwrap().before.as_deref(),
        Some(crate::fixture::KCONFIG)
    );
}
