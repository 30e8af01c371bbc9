use crate::label::Label;
use crate::path::{OutputFile, SourceDir};
use crate::toolchain::Toolchain;

/// Settings shared by every target of one build invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSettings {
    build_dir: SourceDir,
    default_toolchain: Label,
}

impl BuildSettings {
    pub fn new(build_dir: SourceDir, default_toolchain: Label) -> Self {
        Self {
            build_dir,
            default_toolchain,
        }
    }

    pub fn build_dir(&self) -> &SourceDir {
        &self.build_dir
    }

    pub fn default_toolchain(&self) -> &Label {
        &self.default_toolchain
    }
}

/// The build settings as seen from one toolchain. Targets in non-default
/// toolchains get their outputs in a per-toolchain subdirectory and their
/// rules prefixed with the toolchain name.
#[derive(Debug, Clone, Copy)]
pub struct Settings<'a> {
    build: &'a BuildSettings,
    toolchain: &'a Toolchain,
}

impl<'a> Settings<'a> {
    pub fn new(build: &'a BuildSettings, toolchain: &'a Toolchain) -> Self {
        Self { build, toolchain }
    }

    pub fn build_settings(&self) -> &'a BuildSettings {
        self.build
    }

    pub fn build_dir(&self) -> &'a SourceDir {
        &self.build.build_dir
    }

    pub fn toolchain(&self) -> &'a Toolchain {
        self.toolchain
    }

    pub fn is_default(&self) -> bool {
        self.toolchain.label() == &self.build.default_toolchain
    }

    /// `""` for the default toolchain, `"name/"` otherwise.
    pub fn toolchain_output_subdir(&self) -> String {
        if self.is_default() {
            String::new()
        } else {
            format!("{}/", self.toolchain.label().name())
        }
    }

    pub fn rule_prefix(&self) -> String {
        if self.is_default() {
            String::new()
        } else {
            format!("{}_", self.toolchain.label().name())
        }
    }

    pub fn root_out_dir(&self) -> String {
        if self.is_default() {
            ".".into()
        } else {
            self.toolchain.label().name().into()
        }
    }

    pub fn root_gen_dir(&self) -> String {
        format!("{}gen", self.toolchain_output_subdir())
    }

    /// Object directory for sources in `dir`, with a trailing slash.
    pub fn out_dir_for(&self, dir: &SourceDir) -> OutputFile {
        self.dir_under("obj", dir)
    }

    /// Generated-file directory for `dir`, with a trailing slash.
    pub fn gen_dir_for(&self, dir: &SourceDir) -> OutputFile {
        self.dir_under("gen", dir)
    }

    fn dir_under(&self, kind: &str, dir: &SourceDir) -> OutputFile {
        let mut result = OutputFile::new(self.toolchain_output_subdir());
        result.push_str(kind);
        if dir.is_system_absolute() {
            result.push_str("/ABS_PATH");
            result.push_str(dir.value());
            return result;
        }
        result.push_str("/");
        let relative = dir.root_relative();
        if !relative.is_empty() {
            result.push_str(relative);
            result.push_str("/");
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_util::TestSetup;

    #[test]
    fn test_default_toolchain_dirs() {
        let setup = TestSetup::new();
        let settings = Settings::new(&setup.build_settings, &setup.toolchain);
        assert!(settings.is_default());
        assert_eq!(settings.rule_prefix(), "");
        assert_eq!(settings.root_out_dir(), ".");
        assert_eq!(settings.root_gen_dir(), "gen");
        assert_eq!(settings.out_dir_for(&SourceDir::new("//foo/")).value(), "obj/foo/");
        assert_eq!(settings.out_dir_for(&SourceDir::new("//")).value(), "obj/");
        assert_eq!(
            settings.out_dir_for(&SourceDir::new("/usr/include/")).value(),
            "obj/ABS_PATH/usr/include/"
        );
    }

    #[test]
    fn test_secondary_toolchain_dirs() {
        let setup = TestSetup::new();
        let pch = setup.pch_toolchain(crate::tool::PrecompiledHeaderType::Gcc);
        let settings = Settings::new(&setup.build_settings, &pch);
        assert!(!settings.is_default());
        assert_eq!(settings.rule_prefix(), "withpch_");
        assert_eq!(settings.root_out_dir(), "withpch");
        assert_eq!(settings.root_gen_dir(), "withpch/gen");
        assert_eq!(
            settings.gen_dir_for(&SourceDir::new("//foo/")).value(),
            "withpch/gen/foo/"
        );
    }
}
