use crate::path::SourceFile;
use crate::toolchain::Toolchain;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceFileType {
    C,
    Cpp,
    /// Any extension the toolchain lists as assembly.
    Asm,
    /// `.S`: recognised, but no tool compiles it.
    PreprocessedAsm,
    Header,
    ObjC,
    Rc,
    /// Prebuilt objects, passed through to the link.
    Object,
    /// Module-definition files, handed to the linker.
    Def,
    Unknown,
}

impl SourceFileType {
    const COUNT: usize = 10;

    fn index(self) -> usize {
        self as usize
    }

    /// Classifies by extension. Matching is case-sensitive; the fixed table
    /// wins over the toolchain's assembly extensions.
    pub fn classify(file: &SourceFile, toolchain: &Toolchain) -> Self {
        let Some(ext) = file.extension() else {
            return SourceFileType::Unknown;
        };
        match ext {
            "cc" | "cpp" | "cxx" => SourceFileType::Cpp,
            "c" => SourceFileType::C,
            "h" | "hh" | "hpp" => SourceFileType::Header,
            "S" => SourceFileType::PreprocessedAsm,
            "m" | "mm" => SourceFileType::ObjC,
            "rc" => SourceFileType::Rc,
            "o" | "obj" => SourceFileType::Object,
            "def" => SourceFileType::Def,
            _ if toolchain.asm_extensions().iter().any(|e| e == ext) => SourceFileType::Asm,
            _ => SourceFileType::Unknown,
        }
    }
}

/// Which kinds of sources a target has.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SourceFileTypeSet {
    flags: [bool; SourceFileType::COUNT],
}

impl SourceFileTypeSet {
    pub fn set(&mut self, ty: SourceFileType) {
        self.flags[ty.index()] = true;
    }

    pub fn get(&self, ty: SourceFileType) -> bool {
        self.flags[ty.index()]
    }

    pub fn c_family_used(&self) -> bool {
        self.get(SourceFileType::C) || self.get(SourceFileType::Cpp)
    }

    pub fn asm_used(&self) -> bool {
        self.get(SourceFileType::Asm) || self.get(SourceFileType::PreprocessedAsm)
    }
}

impl FromIterator<SourceFileType> for SourceFileTypeSet {
    fn from_iter<I: IntoIterator<Item = SourceFileType>>(iter: I) -> Self {
        let mut set = Self::default();
        for ty in iter {
            set.set(ty);
        }
        set
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::label::Label;

    fn classify(path: &str, toolchain: &Toolchain) -> SourceFileType {
        SourceFileType::classify(&SourceFile::new(path), toolchain)
    }

    #[test]
    fn test_classify() {
        let mut toolchain = Toolchain::new(Label::parse("//toolchain:default").unwrap());
        toolchain.set_asm_extensions(["asm", "s", "arm"]);

        assert_eq!(classify("//foo/a.cc", &toolchain), SourceFileType::Cpp);
        assert_eq!(classify("//foo/a.cpp", &toolchain), SourceFileType::Cpp);
        assert_eq!(classify("//foo/a.cxx", &toolchain), SourceFileType::Cpp);
        assert_eq!(classify("//foo/a.c", &toolchain), SourceFileType::C);
        assert_eq!(classify("//foo/a.o", &toolchain), SourceFileType::Object);
        assert_eq!(classify("//foo/a.obj", &toolchain), SourceFileType::Object);
        assert_eq!(classify("//foo/a.def", &toolchain), SourceFileType::Def);
        assert_eq!(classify("//foo/a.asm", &toolchain), SourceFileType::Asm);
        assert_eq!(classify("//foo/a.s", &toolchain), SourceFileType::Asm);
        assert_eq!(classify("//foo/a.arm", &toolchain), SourceFileType::Asm);
        assert_eq!(classify("//foo/a.h", &toolchain), SourceFileType::Header);
        assert_eq!(classify("//foo/README", &toolchain), SourceFileType::Unknown);
        assert_eq!(classify("//foo/a.txt", &toolchain), SourceFileType::Unknown);
    }

    #[test]
    fn test_classify_is_case_sensitive() {
        let toolchain = Toolchain::new(Label::parse("//toolchain:default").unwrap());
        assert_eq!(classify("//foo/a.s", &toolchain), SourceFileType::Asm);
        assert_eq!(classify("//foo/a.S", &toolchain), SourceFileType::PreprocessedAsm);
        assert_eq!(classify("//foo/a.CC", &toolchain), SourceFileType::Unknown);
    }
}
