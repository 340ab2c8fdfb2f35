use crate::fixture::{self, linux_tree, BOARD, VENDOR};
use hdf_scaffold::config;
use hdf_scaffold::{DriverIdentity, DriverScaffolder, FileKind, Kernel};

const DEFCONFIG: &str =
    "kernel/linux/config/linux-5.10/arch/arm/configs/hispark_taurus_small_defconfig";
const PATCH: &str = "kernel/linux/patches/linux-5.10/hispark_taurus_patch/hispark_taurus.patch";

#[test]
fn test_add_sensor_driver_on_linux() {
    let tree = linux_tree();
    let (config, _) = config::resolve(tree.root(), None).unwrap();
    let id = DriverIdentity::new("sensor", "bmi160", Kernel::Linux, VENDOR, BOARD, "accel").unwrap();

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
            FileKind::Makefile,
            FileKind::Kconfig,
            FileKind::DeviceInfo,
            FileKind::DotConfig,
            FileKind::DotConfig,
        ]
    );
    assert!(report.entries.iter().all(|e| e.outcome.is_applied()), "{report:#?}");
    assert_eq!(report.entries[6].outcome.file(), tree.path(DEFCONFIG));
    assert_eq!(report.entries[7].outcome.file(), tree.path(PATCH));

    let expected_makefile = "\
SENSOR_ROOT_DIR = ../../../../../framework/model/sensor/driver
SENSOR_ROOT_INCLUDE = drivers/hdf/framework/model/sensor/driver

obj-$(CONFIG_DRIVERS_HDF_SENSOR) += $(SENSOR_ROOT_DIR)/common/src/sensor_common.o

obj-$(CONFIG_DRIVERS_HDF_SENSOR_BMI160) += \\
              $(SENSOR_ROOT_DIR)/chipset/accel/accel_bmi160_driver.o
ccflags-y += -I$(srctree)/$(SENSOR_ROOT_INCLUDE)/chipset/accel

ccflags-y += -I$(srctree)/drivers/hdf/framework/include
";
    assert_eq!(
        tree.read("adapter/khdf/linux/model/sensor/Makefile"),
        expected_makefile
    );

    assert_eq!(
        tree.read(DEFCONFIG),
        "CONFIG_DRIVERS_HDF=y
CONFIG_DRIVERS_HDF_INPUT=y
CONFIG_DRIVERS_HDF_SENSOR_ACCEL=y
CONFIG_DRIVERS_HDF_SENSOR_BMI160=y
CONFIG_DRIVERS_HDF_WIFI=y
"
    );
    assert_eq!(
        tree.read(PATCH),
        "+CONFIG_DRIVERS_HDF=y
+CONFIG_DRIVERS_HDF_INPUT=y
+CONFIG_DRIVERS_HDF_SENSOR_ACCEL=y
+CONFIG_DRIVERS_HDF_SENSOR_BMI160=y
+CONFIG_DRIVERS_HDF_WIFI=y
"
    );

    let hcs = tree.read("vendor/hisilicon/hispark_taurus/hdf_config/khdf/device_info.hcs");
    assert!(hcs.contains("\t\t\tdevice_bmi160 :: device {\n"));
    assert!(!tree
        .path("adapter/khdf/linux/model/sensor/BUILD.gn")
        .exists());
}

#[test]
fn test_display_kconfig_uses_disp_namespace() {
    let tree = linux_tree();
    tree.write(
        "adapter/khdf/linux/model/display/Makefile",
        "\
DISPLAY_ROOT_DIR = ../../../../../framework/model/display/driver
DISPLAY_ROOT_INCLUDE = drivers/hdf/framework/model/display/driver

ccflags-y += -I$(srctree)/drivers/hdf/framework/include
",
    );
    tree.write(
        "adapter/khdf/linux/model/display/Kconfig",
        "config DRIVERS_HDF_DISP\n    bool \"Enable HDF Display driver\"\n",
    );
    tree.write(
        "vendor/hisilicon/hispark_taurus/hdf_config/khdf/device_info.hcs",
        &fixture::DEVICE_INFO.replace("sensor", "display"),
    );
    let (config, _) = config::resolve(tree.root(), None).unwrap();
    let id = DriverIdentity::new("display", "icn9700", Kernel::Linux, VENDOR, BOARD, "").unwrap();

    let report = DriverScaffolder::new(&id, tree.root(), &config)
        .unwrap()
        .run()
        .unwrap();
    assert!(report.entries.iter().all(|e| e.outcome.is_applied()), "{report:#?}");

    let kconfig = tree.read("adapter/khdf/linux/model/display/Kconfig");
    assert!(kconfig.contains("config DRIVERS_HDF_DISPLAY_ICN9700\n"));
    assert!(kconfig.contains("    depends on DRIVERS_HDF_DISP\n"));
    assert!(!kconfig.contains("depends on DRIVERS_HDF_DISPLAY\n"));

    let makefile = tree.read("adapter/khdf/linux/model/display/Makefile");
    assert!(makefile.contains("              $(DISPLAY_ROOT_DIR)/icn9700/icn9700_driver.o\n"));
    assert!(makefile.contains("ccflags-y += -I$(srctree)/$(DISPLAY_ROOT_INCLUDE)/icn9700\n"));

    assert!(tree
        .path("framework/model/display/driver/icn9700/icn9700_driver.c")
        .is_file());
    // no device: only the driver's own enable line is propagated
    assert_eq!(
        tree.read(DEFCONFIG),
        "CONFIG_DRIVERS_HDF=y
CONFIG_DRIVERS_HDF_INPUT=y
CONFIG_DRIVERS_HDF_DISPLAY_ICN9700=y
CONFIG_DRIVERS_HDF_WIFI=y
"
    );
}

#[test]
fn test_unconfigured_board_patches_no_dot_configs() {
    let tree = linux_tree();
    let config = config::ToolConfig::default();
    tree.write(
        "vendor/hisilicon/hispark_taurus/hdf_config/device_info.hcs",
        fixture::DEVICE_INFO,
    );
    let id = DriverIdentity::new("sensor", "bmi160", Kernel::Linux, VENDOR, BOARD, "accel").unwrap();

    let report = DriverScaffolder::new(&id, tree.root(), &config)
        .unwrap()
        .run()
        .unwrap();
    assert!(report.entries.iter().all(|e| e.kind != FileKind::DotConfig));
    assert_eq!(tree.read(DEFCONFIG), fixture::LINUX_DEFCONFIG);
}
