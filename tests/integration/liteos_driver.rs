use crate::fixture::{self, liteos_tree, BOARD, VENDOR};
use hdf_scaffold::{
    DriverIdentity, DriverScaffolder, FileKind, Kernel, PatchOutcome, SettingsStore, ToolConfig,
    ToolError,
};

fn bmi160() -> DriverIdentity {
    DriverIdentity::new("sensor", "bmi160", Kernel::Liteos, VENDOR, BOARD, "accel").unwrap()
}

const DRIVER_DIR: &str = "framework/model/sensor/driver/chipset/accel";

#[test]
fn test_add_sensor_driver_patches_every_file() {
    let tree = liteos_tree();
    let config = ToolConfig::default();
    let id = bmi160();

    let report = DriverScaffolder::new(&id, tree.root(), &config)
        .unwrap()
        .run()
        .unwrap();

    let kinds: Vec<FileKind> = report.entries.iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds,
        vec![
            FileKind::DriverSource,
            FileKind::DriverHeader,
            FileKind::Settings,
            FileKind::BuildGn,
            FileKind::Makefile,
            FileKind::Kconfig,
            FileKind::DeviceInfo,
            FileKind::DotConfig,
            FileKind::DotConfig,
        ]
    );
    assert!(report.entries.iter().all(|e| e.outcome.is_applied()), "{report:#?}");
    assert!(report.journal.is_some());

    let source = tree.read(&format!("{DRIVER_DIR}/accel_bmi160_driver.c"));
    assert!(source.starts_with("#include \"accel_bmi160_driver.h\"\n"));
    assert!(source.contains("int32_t Bmi160BindDriver(struct HdfDeviceObject *device)"));
    assert!(source.contains(".moduleName = \"HDF_SENSOR_BMI160\","));
    let header = tree.read(&format!("{DRIVER_DIR}/accel_bmi160_driver.h"));
    assert!(header.starts_with("#ifndef ACCEL_BMI160_DRIVER_H\n"));

    let gn = tree.read("adapter/khdf/liteos/model/sensor/BUILD.gn");
    let expected_gn = fixture::LITEOS_BUILD_GN.replace(
        "sensor_common.c\" ]\n}\n",
        "sensor_common.c\" ]

  if (defined(LOSCFG_DRIVERS_HDF_SENSOR_BMI160)) {
    sources += [ \"$FRAMEWORKS_SENSOR_ROOT/driver/chipset/accel/accel_bmi160_driver.c\" ]
    include_dirs += [ \"$FRAMEWORKS_SENSOR_ROOT/driver/chipset/accel\" ]
  }
}
",
    );
    assert_eq!(gn, expected_gn);

    let makefile = tree.read("adapter/khdf/liteos/model/sensor/Makefile");
    assert!(makefile.contains(
        "\nifeq ($(LOSCFG_DRIVERS_HDF_SENSOR_BMI160), y)
LOCAL_SRCS += $(FRAMEWORKS_SENSOR_ROOT)/driver/chipset/accel/accel_bmi160_driver.c
LOCAL_INCLUDE += $(FRAMEWORKS_SENSOR_ROOT)/driver/chipset/accel
endif
"
    ));
    assert!(makefile.trim_end().ends_with("include $(HDF_DRIVER)"));

    let kconfig = tree.read("adapter/khdf/liteos/model/sensor/Kconfig");
    assert!(kconfig.starts_with(fixture::KCONFIG));
    assert!(kconfig.contains("config DRIVERS_HDF_SENSOR_BMI160\n"));
    assert!(kconfig.contains("    depends on DRIVERS_HDF_SENSOR\n"));

    let hcs = tree.read("vendor/hisilicon/hispark_taurus/hdf_config/device_info.hcs");
    assert!(hcs.contains("\t\t\tdevice_bmi160 :: device {\n"));
    assert!(hcs.contains("moduleName = \"HDF_SENSOR_BMI160\";"));
    assert_eq!(hcs.matches('{').count(), hcs.matches('}').count());
    let sub_block = hcs.find("device_bmi160").unwrap();
    let manager = hcs.find("device_sensor_manager").unwrap();
    assert!(manager < sub_block);

    for name in ["debug_tee.config", "release.config"] {
        assert_eq!(
            tree.read(&format!("vendor/hisilicon/hispark_taurus/kernel_configs/{name}")),
            "LOSCFG_DRIVERS_HDF=y
LOSCFG_DRIVERS_HDF_SENSOR=y
LOSCFG_DRIVERS_HDF_SENSOR_ACCEL=y
LOSCFG_DRIVERS_HDF_SENSOR_BMI160=y
"
        );
    }

    let settings = SettingsStore::open(tree.path("hdf_scaffold_settings.toml")).unwrap();
    assert_eq!(settings.device_dirs("sensor"), vec!["accel"]);
    assert_eq!(
        settings.drivers(Kernel::Liteos, "sensor"),
        vec![(
            "bmi160".to_string(),
            format!("{DRIVER_DIR}/accel_bmi160_driver.c")
        )]
    );
}

#[test]
fn test_second_add_changes_nothing() {
    let tree = liteos_tree();
    let config = ToolConfig::default();
    let id = bmi160();
    let scaffolder = DriverScaffolder::new(&id, tree.root(), &config).unwrap();

    scaffolder.run().unwrap();
    let after_first = tree.snapshot();

    let report = scaffolder.run().unwrap();
    assert_eq!(report.applied().count(), 0);
    assert!(report
        .entries
        .iter()
        .all(|e| matches!(e.outcome, PatchOutcome::AlreadyPresent { .. })));
    assert_eq!(tree.snapshot(), after_first);
}

#[test]
fn test_mixed_case_driver_name_is_idempotent() {
    let tree = liteos_tree();
    let config = ToolConfig::default();
    let upper = DriverIdentity::new("Sensor", "BMI160", Kernel::Liteos, VENDOR, BOARD, "Accel")
        .unwrap();
    DriverScaffolder::new(&upper, tree.root(), &config)
        .unwrap()
        .run()
        .unwrap();
    let after_first = tree.snapshot();
    assert!(tree.path(DRIVER_DIR).join("accel_bmi160_driver.c").is_file());

    let mixed = DriverIdentity::new("sensor", "Bmi160", Kernel::Liteos, VENDOR, BOARD, "accel")
        .unwrap();
    let report = DriverScaffolder::new(&mixed, tree.root(), &config)
        .unwrap()
        .run()
        .unwrap();
    assert_eq!(report.applied().count(), 0, "{report:#?}");
    assert_eq!(tree.snapshot(), after_first);
    let kconfig = tree.read("adapter/khdf/liteos/model/sensor/Kconfig");
    assert_eq!(kconfig.matches("config DRIVERS_HDF_SENSOR_BMI160").count(), 1);
}

#[test]
fn test_second_driver_of_same_device() {
    let tree = liteos_tree();
    let config = ToolConfig::default();
    let first = bmi160();
    let second =
        DriverIdentity::new("sensor", "lsm6ds", Kernel::Liteos, VENDOR, BOARD, "accel").unwrap();

    DriverScaffolder::new(&first, tree.root(), &config).unwrap().run().unwrap();
    DriverScaffolder::new(&second, tree.root(), &config).unwrap().run().unwrap();

    let gn = tree.read("adapter/khdf/liteos/model/sensor/BUILD.gn");
    let bmi = gn.find("SENSOR_BMI160").unwrap();
    let lsm = gn.find("SENSOR_LSM6DS").unwrap();
    assert!(bmi < lsm);
    assert!(gn.ends_with("  }\n}\n"));

    let config_file = tree.read("vendor/hisilicon/hispark_taurus/kernel_configs/release.config");
    assert_eq!(config_file.matches("LOSCFG_DRIVERS_HDF_SENSOR_ACCEL=y").count(), 1);
    assert!(config_file.ends_with("LOSCFG_DRIVERS_HDF_SENSOR_LSM6DS=y\n"));

    let settings = SettingsStore::open(tree.path("hdf_scaffold_settings.toml")).unwrap();
    assert_eq!(settings.device_dirs("sensor"), vec!["accel"]);
    assert_eq!(settings.drivers(Kernel::Liteos, "sensor").len(), 2);
}

#[test]
fn test_missing_hcs_block_stops_the_run() {
    let tree = liteos_tree();
    tree.write(
        "vendor/hisilicon/hispark_taurus/hdf_config/device_info.hcs",
        "root {\n    device_info {\n    }\n}\n",
    );
    let config = ToolConfig::default();
    let id = bmi160();
    let scaffolder = DriverScaffolder::new(&id, tree.root(), &config).unwrap();

    let err = scaffolder.run().unwrap_err();
    assert!(matches!(err, ToolError::TargetNotExist { what: "HCS module block", .. }));

    // steps before the failure stay applied and journaled
    assert!(tree.read("adapter/khdf/liteos/model/sensor/Kconfig").contains("BMI160"));
    assert!(scaffolder.journal_path().is_file());
    assert_eq!(
        tree.read("vendor/hisilicon/hispark_taurus/kernel_configs/release.config"),
        fixture::LITEOS_DOT_CONFIG
    );
}

#[test]
fn test_missing_build_gn_is_target_not_exist() {
    let tree = liteos_tree();
    std::fs::remove_file(tree.path("adapter/khdf/liteos/model/sensor/BUILD.gn")).unwrap();
    let config = ToolConfig::default();
    let id = bmi160();

    let err = DriverScaffolder::new(&id, tree.root(), &config)
        .unwrap()
        .run()
        .unwrap_err();
    assert_eq!(err.code().as_u8(), 2);
}

#[test]
fn test_status_reflects_progress() {
    let tree = liteos_tree();
    let config = ToolConfig::default();
    let id = bmi160();
    let scaffolder = DriverScaffolder::new(&id, tree.root(), &config).unwrap();

    let before = scaffolder.status().unwrap();
    assert!(before.iter().all(|e| !e.configured));
    assert!(before
        .iter()
        .filter(|e| e.kind == FileKind::BuildGn)
        .all(|e| e.exists));

    scaffolder.run().unwrap();
    let after = scaffolder.status().unwrap();
    assert_eq!(after.len(), before.len());
    assert!(after.iter().all(|e| e.exists && e.configured), "{after:#?}");
}
