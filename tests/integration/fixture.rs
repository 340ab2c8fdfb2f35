//! Mock HDF source trees for end-to-end runs.

use hdf_scaffold::RootGuard;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use walkdir::WalkDir;

pub const TEMPLATE_ROOT: &str = "tools/hdf_dev_eco_tool/resources/templates/lite";
pub const VENDOR: &str = "hisilicon";
pub const BOARD: &str = "hispark_taurus";

pub const LITEOS_BUILD_GN: &str = r#"import("//drivers/adapter/khdf/liteos/hdf.gni")

FRAMEWORKS_SENSOR_ROOT = "//drivers/hdf_core/framework/model/sensor"

module_switch = defined(LOSCFG_DRIVERS_HDF_SENSOR)
module_name = "hdf_sensor_driver"
hdf_driver(module_name) {
  sources = [ "$FRAMEWORKS_SENSOR_ROOT/driver/common/src/sensor_common.c" ]
}
"#;

pub const LITEOS_MAKEFILE: &str = "\
include $(LITEOSTOPDIR)/../../drivers/hdf_core/adapter/khdf/liteos/lite.mk

MODULE_NAME := hdf_sensor_driver
FRAMEWORKS_SENSOR_ROOT = $(LITEOSTOPDIR)/../../drivers/hdf_core/framework/model/sensor
LOCAL_SRCS += $(FRAMEWORKS_SENSOR_ROOT)/driver/common/src/sensor_common.c

include $(HDF_DRIVER)
";

pub const LINUX_MAKEFILE: &str = "\
SENSOR_ROOT_DIR = ../../../../../framework/model/sensor/driver
SENSOR_ROOT_INCLUDE = drivers/hdf/framework/model/sensor/driver

obj-$(CONFIG_DRIVERS_HDF_SENSOR) += $(SENSOR_ROOT_DIR)/common/src/sensor_common.o

ccflags-y += -I$(srctree)/drivers/hdf/framework/include
";

pub const KCONFIG: &str = "\
config DRIVERS_HDF_SENSOR
    bool \"Enable HDF sensor driver\"
    default n
    depends on DRIVERS_HDF
";

pub const DEVICE_INFO: &str = "\
root {
    device_info {
        match_attr = \"hdf_manager\";
        template host {
            hostName = \"\";
        }
        sensor :: host {
            hostName = \"sensor_host\";
            device_sensor_manager :: device {
                device0 :: deviceNode {
                    policy = 2;
                }
            }
        }
    }
}
";

pub const LITEOS_DOT_CONFIG: &str = "\
LOSCFG_DRIVERS_HDF=y
# LOSCFG_DRIVERS_HDF_SENSOR_ACCEL is not set
LOSCFG_DRIVERS_HDF_SENSOR=y
";

pub const LINUX_DEFCONFIG: &str = "\
CONFIG_DRIVERS_HDF=y
CONFIG_DRIVERS_HDF_INPUT=y
CONFIG_DRIVERS_HDF_WIFI=y
";

pub const LINUX_PATCH: &str = "\
+CONFIG_DRIVERS_HDF=y
+CONFIG_DRIVERS_HDF_INPUT=y
+CONFIG_DRIVERS_HDF_WIFI=y
";

/// Tool config for the Linux tree: the board's hcs location and its
/// defconfig and patch file names.
pub const LINUX_TOOL_CONFIG: &str = r#"
[boards.hispark_taurus]
parent_path = "vendor/hisilicon/hispark_taurus/hdf_config/khdf"
dot_config_files = ["hispark_taurus_small_defconfig", "hispark_taurus.patch"]
"#;

pub struct Tree {
    pub dir: TempDir,
}

impl Tree {
    pub fn root(&self) -> &Path {
        self.dir.path()
    }

    pub fn path(&self, relative: &str) -> PathBuf {
        self.dir.path().join(relative)
    }

    pub fn read(&self, relative: &str) -> String {
        fs::read_to_string(self.path(relative)).unwrap()
    }

    pub fn write(&self, relative: &str, contents: &str) {
        let path = self.path(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }

    /// Guard over the tree with its template directory protected.
    pub fn guard(&self) -> RootGuard {
        RootGuard::new(self.root(), &self.path(TEMPLATE_ROOT)).unwrap()
    }

    /// Snapshot of every file outside the journal directory.
    pub fn snapshot(&self) -> Vec<(PathBuf, String)> {
        let mut files: Vec<(PathBuf, String)> = WalkDir::new(self.root())
            .into_iter()
            .filter_map(Result::ok)
            .filter(|e| e.file_type().is_file())
            .filter(|e| !e.path().to_string_lossy().contains(".hdf_scaffold"))
            .map(|e| {
                let text = fs::read_to_string(e.path()).unwrap();
                (e.path().to_path_buf(), text)
            })
            .collect();
        files.sort();
        files
    }
}

fn copy_templates(root: &Path) {
    let source = Path::new(env!("CARGO_MANIFEST_DIR")).join("templates/lite");
    let dest = root.join(TEMPLATE_ROOT);
    for entry in WalkDir::new(&source).into_iter().filter_map(Result::ok) {
        let target = dest.join(entry.path().strip_prefix(&source).unwrap());
        if entry.file_type().is_dir() {
            fs::create_dir_all(&target).unwrap();
        } else {
            fs::copy(entry.path(), &target).unwrap();
        }
    }
}

pub fn liteos_tree() -> Tree {
    let tree = Tree {
        dir: TempDir::new().unwrap(),
    };
    copy_templates(tree.root());
    tree.write("adapter/khdf/liteos/model/sensor/BUILD.gn", LITEOS_BUILD_GN);
    tree.write("adapter/khdf/liteos/model/sensor/Makefile", LITEOS_MAKEFILE);
    tree.write("adapter/khdf/liteos/model/sensor/Kconfig", KCONFIG);
    tree.write(
        "vendor/hisilicon/hispark_taurus/hdf_config/device_info.hcs",
        DEVICE_INFO,
    );
    tree.write(
        "vendor/hisilicon/hispark_taurus/kernel_configs/debug_tee.config",
        LITEOS_DOT_CONFIG,
    );
    tree.write(
        "vendor/hisilicon/hispark_taurus/kernel_configs/release.config",
        LITEOS_DOT_CONFIG,
    );
    tree
}

pub fn linux_tree() -> Tree {
    let tree = Tree {
        dir: TempDir::new().unwrap(),
    };
    copy_templates(tree.root());
    tree.write("adapter/khdf/linux/model/sensor/Makefile", LINUX_MAKEFILE);
    tree.write("adapter/khdf/linux/model/sensor/Kconfig", KCONFIG);
    tree.write(
        "vendor/hisilicon/hispark_taurus/hdf_config/khdf/device_info.hcs",
        DEVICE_INFO,
    );
    tree.write(
        "kernel/linux/config/linux-5.10/arch/arm/configs/hispark_taurus_small_defconfig",
        LINUX_DEFCONFIG,
    );
    tree.write(
        "kernel/linux/patches/linux-5.10/hispark_taurus_patch/hispark_taurus.patch",
        LINUX_PATCH,
    );
    tree.write("hdf_scaffold.toml", LINUX_TOOL_CONFIG);
    tree
}
