//! Minimal JVM class-file reader: the class name and its class-level annotations.
//!
//! Only what the provider scan needs is decoded. Fields, methods, and other
//! attributes are skipped by length.

const MAGIC: u32 = 0xCAFE_BABE;
const MAX_ELEMENT_DEPTH: usize = 64;

/// The parts of a class file the provider scan looks at.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassInfo {
    /// Binary class name with dots, e.g. `com.example.MyProvider`.
    pub name: String,
    /// Binary names of class-level annotations, visible and invisible.
    pub annotations: Vec<String>,
}

impl ClassInfo {
    pub fn has_annotation(&self, annotation: &str) -> bool {
        self.annotations.iter().any(|a| a == annotation)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ClassFileError {
    #[error("not a class file")]
    BadMagic,
    #[error("unexpected end of data at byte {offset}")]
    Truncated { offset: usize },
    #[error("unknown constant pool tag {tag} at entry {index}")]
    UnknownTag { tag: u8, index: u16 },
    #[error("constant pool entry {index} is not a {expected}")]
    BadConstant { index: u16, expected: &'static str },
    #[error("unknown annotation element tag '{tag}'")]
    BadElement { tag: char },
    #[error("annotation values nested deeper than {MAX_ELEMENT_DEPTH} levels")]
    TooDeep,
}

#[derive(Debug, Clone)]
enum Constant {
    Utf8(String),
    Class(u16),
    Other,
    /// Second slot of a long or double.
    Unusable,
}

struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    fn bytes(&mut self, len: usize) -> Result<&'a [u8], ClassFileError> {
        let end = self
            .pos
            .checked_add(len)
            .ok_or(ClassFileError::Truncated { offset: self.pos })?;
        let slice = self
            .data
            .get(self.pos..end)
            .ok_or(ClassFileError::Truncated { offset: self.pos })?;
        self.pos = end;
        Ok(slice)
    }

    fn u8(&mut self) -> Result<u8, ClassFileError> {
        let b = self.bytes(1)?;
        b.first()
            .copied()
            .ok_or(ClassFileError::Truncated { offset: self.pos })
    }

    fn u16(&mut self) -> Result<u16, ClassFileError> {
        let b = self.bytes(2)?;
        match b {
            [hi, lo] => Ok(u16::from_be_bytes([*hi, *lo])),
            _ => Err(ClassFileError::Truncated { offset: self.pos }),
        }
    }

    fn u32(&mut self) -> Result<u32, ClassFileError> {
        let b = self.bytes(4)?;
        match b {
            [a, b, c, d] => Ok(u32::from_be_bytes([*a, *b, *c, *d])),
            _ => Err(ClassFileError::Truncated { offset: self.pos }),
        }
    }

    fn skip(&mut self, len: usize) -> Result<(), ClassFileError> {
        self.bytes(len).map(|_| ())
    }

    fn skip_u32_len(&mut self) -> Result<(), ClassFileError> {
        let len = self.u32()?;
        let len = usize::try_from(len).map_err(|_| ClassFileError::Truncated { offset: self.pos })?;
        self.skip(len)
    }
}

struct ConstantPool(Vec<Constant>);

impl ConstantPool {
    fn read(r: &mut Reader<'_>) -> Result<Self, ClassFileError> {
        let count = r.u16()?;
        // Index 0 is unused.
        let mut entries = vec![Constant::Unusable];
        let mut index: u16 = 1;
        while index < count {
            let tag = r.u8()?;
            let mut wide = false;
            let entry = match tag {
                1 => {
                    let len = usize::from(r.u16()?);
                    Constant::Utf8(String::from_utf8_lossy(r.bytes(len)?).into_owned())
                }
                7 => Constant::Class(r.u16()?),
                3 | 4 => {
                    r.skip(4)?;
                    Constant::Other
                }
                5 | 6 => {
                    r.skip(8)?;
                    wide = true;
                    Constant::Other
                }
                8 | 16 | 19 | 20 => {
                    r.skip(2)?;
                    Constant::Other
                }
                9 | 10 | 11 | 12 | 17 | 18 => {
                    r.skip(4)?;
                    Constant::Other
                }
                15 => {
                    r.skip(3)?;
                    Constant::Other
                }
                _ => return Err(ClassFileError::UnknownTag { tag, index }),
            };
            entries.push(entry);
            index = index.saturating_add(1);
            if wide {
                entries.push(Constant::Unusable);
                index = index.saturating_add(1);
            }
        }
        Ok(Self(entries))
    }

    fn utf8(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.0.get(usize::from(index)) {
            Some(Constant::Utf8(s)) => Ok(s),
            _ => Err(ClassFileError::BadConstant {
                index,
                expected: "Utf8",
            }),
        }
    }

    fn class_name(&self, index: u16) -> Result<&str, ClassFileError> {
        match self.0.get(usize::from(index)) {
            Some(Constant::Class(name_index)) => self.utf8(*name_index),
            _ => Err(ClassFileError::BadConstant {
                index,
                expected: "Class",
            }),
        }
    }
}

/// Parse a class file.
///
/// # Errors
/// Returns an error if the data is not a well-formed class file.
pub fn parse_class(data: &[u8]) -> Result<ClassInfo, ClassFileError> {
    let mut r = Reader::new(data);
    if r.u32()? != MAGIC {
        return Err(ClassFileError::BadMagic);
    }
    r.skip(4)?; // minor, major

    let pool = ConstantPool::read(&mut r)?;

    r.skip(2)?; // access flags
    let this_class = r.u16()?;
    let name = pool.class_name(this_class)?.replace('/', ".");
    r.skip(2)?; // super class

    let interfaces = usize::from(r.u16()?);
    r.skip(interfaces * 2)?;

    // fields, then methods
    for _ in 0..2 {
        let members = r.u16()?;
        for _ in 0..members {
            r.skip(6)?;
            skip_attributes(&mut r)?;
        }
    }

    let mut annotations = Vec::new();
    let attributes = r.u16()?;
    for _ in 0..attributes {
        let attr_name = pool.utf8(r.u16()?)?;
        if attr_name == "RuntimeVisibleAnnotations" || attr_name == "RuntimeInvisibleAnnotations"
        {
            let len = usize::try_from(r.u32()?)
                .map_err(|_| ClassFileError::Truncated { offset: r.pos })?;
            let mut body = Reader::new(r.bytes(len)?);
            let count = body.u16()?;
            for _ in 0..count {
                annotations.push(read_annotation(&mut body, &pool, 0)?);
            }
        } else {
            r.skip_u32_len()?;
        }
    }

    Ok(ClassInfo { name, annotations })
}

fn skip_attributes(r: &mut Reader<'_>) -> Result<(), ClassFileError> {
    let count = r.u16()?;
    for _ in 0..count {
        r.skip(2)?;
        r.skip_u32_len()?;
    }
    Ok(())
}

/// Read one annotation and return its binary type name.
fn read_annotation(
    r: &mut Reader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<String, ClassFileError> {
    let descriptor = pool.utf8(r.u16()?)?;
    let pairs = r.u16()?;
    for _ in 0..pairs {
        r.skip(2)?; // element name
        skip_element_value(r, pool, depth + 1)?;
    }
    Ok(descriptor_to_binary_name(descriptor))
}

fn skip_element_value(
    r: &mut Reader<'_>,
    pool: &ConstantPool,
    depth: usize,
) -> Result<(), ClassFileError> {
    if depth > MAX_ELEMENT_DEPTH {
        return Err(ClassFileError::TooDeep);
    }
    let tag = r.u8()?;
    match tag {
        b'B' | b'C' | b'D' | b'F' | b'I' | b'J' | b'S' | b'Z' | b's' | b'c' => r.skip(2),
        b'e' => r.skip(4),
        b'@' => read_annotation(r, pool, depth).map(|_| ()),
        b'[' => {
            let count = r.u16()?;
            for _ in 0..count {
                skip_element_value(r, pool, depth + 1)?;
            }
            Ok(())
        }
        other => Err(ClassFileError::BadElement {
            tag: char::from(other),
        }),
    }
}

/// `Lcom/example/Foo;` to `com.example.Foo`.
fn descriptor_to_binary_name(descriptor: &str) -> String {
    descriptor
        .strip_prefix('L')
        .and_then(|d| d.strip_suffix(';'))
        .unwrap_or(descriptor)
        .replace('/', ".")
}
