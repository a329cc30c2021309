//! Program Loader
//!
//! Reads and writes the binary program container and validates what it
//! loads. Layout, all integers big-endian:
//!
//! ```text
//!   u32 magic "BROK"      u8 major, u8 minor, u8 patch, u8 reserved
//!   u32 string count      per string: u32 length, UTF-8 bytes
//!   u32 value count       per value: u8 tag, payload
//!   u32 code length       code bytes
//! ```
//!
//! Environment tags: 0 null, 1 boolean (u8), 2 integer (i64), 3 string
//! (u32 table index), 4 function (u32 address), 5 builtin (u32 table index
//! of its name).

use std::sync::Arc;

use log::debug;

use crate::error::{VmError, VmResult};
use crate::native::registry::BuiltinRegistry;
use crate::program::Program;
use crate::vm::value::{Function, Value};

use super::verify;

/// Program magic: "BROK"
const PROGRAM_MAGIC: u32 = 0x4252_4F4B;

/// Supported program version
const VERSION_MAJOR: u8 = 1;

/// Header plus the three section counts
const MIN_FILE_SIZE: usize = 20;

const TAG_NULL: u8 = 0x00;
const TAG_BOOLEAN: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_STRING: u8 = 0x03;
const TAG_FUNCTION: u8 = 0x04;
const TAG_BUILTIN: u8 = 0x05;

/// Program loader
pub struct ProgramLoader;

impl ProgramLoader {
    /// Load and validate a program, resolving builtin names in `registry`
    pub fn load(bytes: &[u8], registry: &BuiltinRegistry) -> VmResult<Program> {
        let program = Self::parse(bytes, registry)?;
        verify::verify(&program)?;
        debug!(
            "loaded program: {} bytes of code, {} strings, {} environment values",
            program.code.len(),
            program.strings.len(),
            program.environment.len()
        );
        Ok(program)
    }

    /// Parse without validating the instruction stream
    pub fn parse(bytes: &[u8], registry: &BuiltinRegistry) -> VmResult<Program> {
        if bytes.len() < MIN_FILE_SIZE {
            return Err(VmError::ProgramTooShort);
        }

        let mut cursor = 0;

        // Magic
        let magic = Self::read_u32(bytes, &mut cursor)?;
        if magic != PROGRAM_MAGIC {
            return Err(VmError::InvalidMagicNumber);
        }

        // Version
        let major = Self::read_u8(bytes, &mut cursor)?;
        let _minor = Self::read_u8(bytes, &mut cursor)?;
        let _patch = Self::read_u8(bytes, &mut cursor)?;

        if major != VERSION_MAJOR {
            return Err(VmError::InvalidProgramVersion(major));
        }

        // Reserved
        Self::read_u8(bytes, &mut cursor)?;

        // String table
        let string_count = Self::read_u32(bytes, &mut cursor)? as usize;
        let mut strings = Vec::with_capacity(string_count.min(bytes.len()));
        for _ in 0..string_count {
            strings.push(Self::read_string(bytes, &mut cursor)?);
        }

        // Environment
        let value_count = Self::read_u32(bytes, &mut cursor)? as usize;
        let mut environment = Vec::with_capacity(value_count.min(bytes.len()));
        for _ in 0..value_count {
            environment.push(Self::read_value(bytes, &mut cursor, &strings, registry)?);
        }

        // Instructions
        let code_len = Self::read_u32(bytes, &mut cursor)? as usize;
        let code = Self::read_bytes(bytes, &mut cursor, code_len)?.to_vec();

        if cursor != bytes.len() {
            return Err(VmError::MalformedProgram(format!(
                "{} trailing bytes",
                bytes.len() - cursor
            )));
        }

        Ok(Program::new(code, strings, environment))
    }

    /// Serialise a program. Builtin names are added to the string table
    /// when missing; functions that already carry bindings cannot be stored.
    pub fn encode(program: &Program) -> VmResult<Vec<u8>> {
        let mut strings = program.strings.clone();
        let mut values = Vec::new();
        for value in &program.environment {
            Self::write_value(&mut values, value, &mut strings)?;
        }

        let mut out = Vec::with_capacity(MIN_FILE_SIZE + values.len() + program.code.len());
        out.extend_from_slice(&PROGRAM_MAGIC.to_be_bytes());
        out.extend_from_slice(&[VERSION_MAJOR, 0, 0, 0]);

        Self::write_len(&mut out, strings.len())?;
        for text in &strings {
            Self::write_len(&mut out, text.len())?;
            out.extend_from_slice(text.as_bytes());
        }

        Self::write_len(&mut out, program.environment.len())?;
        out.extend_from_slice(&values);

        Self::write_len(&mut out, program.code.len())?;
        out.extend_from_slice(&program.code);
        Ok(out)
    }

    fn read_value(
        bytes: &[u8],
        cursor: &mut usize,
        strings: &[Arc<str>],
        registry: &BuiltinRegistry,
    ) -> VmResult<Value> {
        let tag = Self::read_u8(bytes, cursor)?;

        match tag {
            TAG_NULL => Ok(Value::Null),
            TAG_BOOLEAN => {
                let b = Self::read_u8(bytes, cursor)?;
                Ok(Value::Boolean(b != 0))
            }
            TAG_INTEGER => {
                let raw = Self::read_bytes(bytes, cursor, 8)?;
                let mut be = [0u8; 8];
                be.copy_from_slice(raw);
                Ok(Value::Integer(i64::from_be_bytes(be)))
            }
            TAG_STRING => {
                let index = Self::read_u32(bytes, cursor)? as usize;
                Ok(Value::String(Self::table_entry(strings, index)?.clone()))
            }
            TAG_FUNCTION => {
                let address = Self::read_u32(bytes, cursor)? as usize;
                Ok(Value::Function(Function::new(address)))
            }
            TAG_BUILTIN => {
                let index = Self::read_u32(bytes, cursor)? as usize;
                let name = Self::table_entry(strings, index)?;
                registry.value(name)
            }
            other => Err(VmError::MalformedProgram(format!(
                "unknown value tag 0x{other:02X}"
            ))),
        }
    }

    fn write_value(out: &mut Vec<u8>, value: &Value, strings: &mut Vec<Arc<str>>) -> VmResult<()> {
        match value {
            Value::Null => out.push(TAG_NULL),
            Value::Boolean(b) => out.extend_from_slice(&[TAG_BOOLEAN, u8::from(*b)]),
            Value::Integer(n) => {
                out.push(TAG_INTEGER);
                out.extend_from_slice(&n.to_be_bytes());
            }
            Value::String(text) => {
                out.push(TAG_STRING);
                let index = Self::intern(strings, text);
                Self::write_len(out, index)?;
            }
            Value::Function(function) => {
                if !function.bindings().is_empty() {
                    return Err(VmError::MalformedProgram(
                        "closures with bindings cannot be encoded".to_string(),
                    ));
                }
                out.push(TAG_FUNCTION);
                Self::write_len(out, function.address)?;
            }
            Value::Builtin(builtin) => {
                out.push(TAG_BUILTIN);
                let index = Self::intern(strings, builtin.name);
                Self::write_len(out, index)?;
            }
        }
        Ok(())
    }

    fn intern(strings: &mut Vec<Arc<str>>, text: &str) -> usize {
        match strings.iter().position(|s| &**s == text) {
            Some(index) => index,
            None => {
                strings.push(Arc::from(text));
                strings.len() - 1
            }
        }
    }

    fn table_entry(strings: &[Arc<str>], index: usize) -> VmResult<&Arc<str>> {
        strings.get(index).ok_or_else(|| {
            VmError::MalformedProgram(format!("string index {index} is out of range"))
        })
    }

    fn write_len(out: &mut Vec<u8>, len: usize) -> VmResult<()> {
        let len = u32::try_from(len)
            .map_err(|_| VmError::MalformedProgram(format!("{len} does not fit in 32 bits")))?;
        out.extend_from_slice(&len.to_be_bytes());
        Ok(())
    }

    fn read_string(bytes: &[u8], cursor: &mut usize) -> VmResult<Arc<str>> {
        let len = Self::read_u32(bytes, cursor)? as usize;
        let raw = Self::read_bytes(bytes, cursor, len)?;
        let text = std::str::from_utf8(raw)
            .map_err(|e| VmError::MalformedProgram(format!("invalid UTF-8 in string table: {e}")))?;
        Ok(Arc::from(text))
    }

    fn read_bytes<'a>(bytes: &'a [u8], cursor: &mut usize, len: usize) -> VmResult<&'a [u8]> {
        let end = cursor.checked_add(len).ok_or(VmError::ProgramTooShort)?;
        if end > bytes.len() {
            return Err(VmError::ProgramTooShort);
        }
        let slice = &bytes[*cursor..end];
        *cursor = end;
        Ok(slice)
    }

    fn read_u8(bytes: &[u8], cursor: &mut usize) -> VmResult<u8> {
        Ok(Self::read_bytes(bytes, cursor, 1)?[0])
    }

    fn read_u32(bytes: &[u8], cursor: &mut usize) -> VmResult<u32> {
        let raw = Self::read_bytes(bytes, cursor, 4)?;
        Ok(u32::from_be_bytes([raw[0], raw[1], raw[2], raw[3]]))
    }
}
