// ABOUTME: Versioned binary codec round-tripping the syntax tree

use crate::ast::{BinaryOp, ElseIf, Expression, Program, Statement, UnaryOp};
use crate::error::BytecodeError;

/// File prefix identifying a bytecode image.
pub const MAGIC: [u8; 4] = [0x10, 0x1E, 0x4E, 0x47];
/// Current format version, bumped on any layout change.
pub const VERSION: u8 = 0x01;

// Node tags, one byte each, stable across versions. Statements first, then
// expressions; Break sits after the original allocation.
const TAG_VARIABLE_DECL: u8 = 1;
const TAG_ASSIGNMENT: u8 = 2;
const TAG_FUNCTION_DECL: u8 = 3;
const TAG_CALL_STATEMENT: u8 = 4;
const TAG_IF: u8 = 5;
const TAG_WHILE: u8 = 6;
const TAG_FOR: u8 = 7;
const TAG_FOR_EACH: u8 = 8;
const TAG_INDEX_ASSIGNMENT: u8 = 9;
const TAG_RETURN: u8 = 10;
const TAG_OUTPUT: u8 = 11;
const TAG_TOGGLE: u8 = 12;
const TAG_NUMBER: u8 = 13;
const TAG_STRING: u8 = 14;
const TAG_BOOL: u8 = 15;
const TAG_LIST: u8 = 16;
const TAG_IDENTIFIER: u8 = 17;
const TAG_BINARY: u8 = 18;
const TAG_UNARY: u8 = 19;
const TAG_FUNCTION_CALL: u8 = 20;
const TAG_INDEX: u8 = 21;
const TAG_LENGTH: u8 = 22;
const TAG_LOCATION: u8 = 23;
const TAG_BREAK: u8 = 24;

/// Serializes a program: magic, version, statement count, statements.
pub fn encode(program: &Program) -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC);
    out.push(VERSION);
    write_u32(&mut out, program.statements.len() as u32);
    for statement in &program.statements {
        encode_statement(&mut out, statement);
    }
    out
}

/// Deserializes a program, checking magic, version and exact length.
pub fn decode(bytes: &[u8]) -> Result<Program, BytecodeError> {
    let mut reader = Reader { bytes, pos: 0 };
    let magic = reader.take(4)?;
    if magic != MAGIC {
        return Err(BytecodeError::BadMagic);
    }
    let version = reader.read_u8()?;
    if version != VERSION {
        return Err(BytecodeError::UnsupportedVersion(version));
    }
    let count = reader.read_u32()?;
    let mut statements = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        statements.push(decode_statement(&mut reader)?);
    }
    if reader.pos != bytes.len() {
        return Err(BytecodeError::TrailingBytes(bytes.len() - reader.pos));
    }
    Ok(Program { statements })
}

// ----------------------------------------------------------------------
// Encoding
// ----------------------------------------------------------------------

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn write_string(out: &mut Vec<u8>, value: &str) {
    write_u32(out, value.len() as u32);
    out.extend_from_slice(value.as_bytes());
}

fn write_bool(out: &mut Vec<u8>, value: bool) {
    out.push(u8::from(value));
}

fn write_block(out: &mut Vec<u8>, statements: &[Statement]) {
    write_u32(out, statements.len() as u32);
    for statement in statements {
        encode_statement(out, statement);
    }
}

fn encode_statement(out: &mut Vec<u8>, statement: &Statement) {
    match statement {
        Statement::VariableDecl {
            name,
            constant,
            value,
        } => {
            out.push(TAG_VARIABLE_DECL);
            write_string(out, name);
            write_bool(out, *constant);
            encode_expression(out, value);
        }
        Statement::Assignment { name, value } => {
            out.push(TAG_ASSIGNMENT);
            write_string(out, name);
            encode_expression(out, value);
        }
        Statement::FunctionDecl { name, params, body } => {
            out.push(TAG_FUNCTION_DECL);
            write_string(out, name);
            write_u32(out, params.len() as u32);
            for param in params {
                write_string(out, param);
            }
            write_block(out, body);
        }
        Statement::Call(call) => {
            out.push(TAG_CALL_STATEMENT);
            encode_expression(out, call);
        }
        Statement::If {
            condition,
            then_body,
            else_ifs,
            else_body,
        } => {
            out.push(TAG_IF);
            encode_expression(out, condition);
            write_block(out, then_body);
            write_u32(out, else_ifs.len() as u32);
            for arm in else_ifs {
                encode_expression(out, &arm.condition);
                write_block(out, &arm.body);
            }
            write_block(out, else_body);
        }
        Statement::While { condition, body } => {
            out.push(TAG_WHILE);
            encode_expression(out, condition);
            write_block(out, body);
        }
        Statement::For { count, body } => {
            out.push(TAG_FOR);
            encode_expression(out, count);
            write_block(out, body);
        }
        Statement::ForEach { name, list, body } => {
            out.push(TAG_FOR_EACH);
            write_string(out, name);
            encode_expression(out, list);
            write_block(out, body);
        }
        Statement::IndexAssignment { name, index, value } => {
            out.push(TAG_INDEX_ASSIGNMENT);
            write_string(out, name);
            encode_expression(out, index);
            encode_expression(out, value);
        }
        Statement::Return(value) => {
            out.push(TAG_RETURN);
            encode_expression(out, value);
        }
        Statement::Output(value) => {
            out.push(TAG_OUTPUT);
            encode_expression(out, value);
        }
        Statement::Toggle(name) => {
            out.push(TAG_TOGGLE);
            write_string(out, name);
        }
        Statement::Break => {
            out.push(TAG_BREAK);
        }
    }
}

fn encode_expression(out: &mut Vec<u8>, expression: &Expression) {
    match expression {
        Expression::NumberLiteral(n) => {
            out.push(TAG_NUMBER);
            out.extend_from_slice(&n.to_le_bytes());
        }
        Expression::StringLiteral(s) => {
            out.push(TAG_STRING);
            write_string(out, s);
        }
        Expression::BoolLiteral(b) => {
            out.push(TAG_BOOL);
            write_bool(out, *b);
        }
        Expression::ListLiteral(elements) => {
            out.push(TAG_LIST);
            write_u32(out, elements.len() as u32);
            for element in elements {
                encode_expression(out, element);
            }
        }
        Expression::Identifier(name) => {
            out.push(TAG_IDENTIFIER);
            write_string(out, name);
        }
        Expression::Binary { op, left, right } => {
            out.push(TAG_BINARY);
            write_string(out, op.symbol());
            encode_expression(out, left);
            encode_expression(out, right);
        }
        Expression::Unary { op, operand } => {
            out.push(TAG_UNARY);
            write_string(out, op.symbol());
            encode_expression(out, operand);
        }
        Expression::FunctionCall { name, args } => {
            out.push(TAG_FUNCTION_CALL);
            write_string(out, name);
            write_u32(out, args.len() as u32);
            for arg in args {
                encode_expression(out, arg);
            }
        }
        Expression::Index { list, index } => {
            out.push(TAG_INDEX);
            encode_expression(out, list);
            encode_expression(out, index);
        }
        Expression::Length(inner) => {
            out.push(TAG_LENGTH);
            encode_expression(out, inner);
        }
        Expression::Location(name) => {
            out.push(TAG_LOCATION);
            write_string(out, name);
        }
    }
}

// ----------------------------------------------------------------------
// Decoding
// ----------------------------------------------------------------------

struct Reader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, n: usize) -> Result<&'a [u8], BytecodeError> {
        if self.pos + n > self.bytes.len() {
            return Err(BytecodeError::UnexpectedEof);
        }
        let slice = &self.bytes[self.pos..self.pos + n];
        self.pos += n;
        Ok(slice)
    }

    fn read_u8(&mut self) -> Result<u8, BytecodeError> {
        Ok(self.take(1)?[0])
    }

    fn read_bool(&mut self) -> Result<bool, BytecodeError> {
        Ok(self.read_u8()? != 0)
    }

    fn read_u32(&mut self) -> Result<u32, BytecodeError> {
        let bytes = self.take(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    fn read_f64(&mut self) -> Result<f64, BytecodeError> {
        let bytes = self.take(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(f64::from_le_bytes(raw))
    }

    fn read_string(&mut self) -> Result<String, BytecodeError> {
        let len = self.read_u32()? as usize;
        let bytes = self.take(len)?;
        String::from_utf8(bytes.to_vec()).map_err(|_| BytecodeError::InvalidUtf8)
    }
}

fn decode_block(reader: &mut Reader) -> Result<Vec<Statement>, BytecodeError> {
    let count = reader.read_u32()?;
    let mut statements = Vec::with_capacity(count.min(1024) as usize);
    for _ in 0..count {
        statements.push(decode_statement(reader)?);
    }
    Ok(statements)
}

fn decode_statement(reader: &mut Reader) -> Result<Statement, BytecodeError> {
    let tag = reader.read_u8()?;
    match tag {
        TAG_VARIABLE_DECL => Ok(Statement::VariableDecl {
            name: reader.read_string()?,
            constant: reader.read_bool()?,
            value: decode_expression(reader)?,
        }),
        TAG_ASSIGNMENT => Ok(Statement::Assignment {
            name: reader.read_string()?,
            value: decode_expression(reader)?,
        }),
        TAG_FUNCTION_DECL => {
            let name = reader.read_string()?;
            let param_count = reader.read_u32()?;
            let mut params = Vec::with_capacity(param_count.min(256) as usize);
            for _ in 0..param_count {
                params.push(reader.read_string()?);
            }
            let body = decode_block(reader)?;
            Ok(Statement::FunctionDecl { name, params, body })
        }
        TAG_CALL_STATEMENT => Ok(Statement::Call(decode_expression(reader)?)),
        TAG_IF => {
            let condition = decode_expression(reader)?;
            let then_body = decode_block(reader)?;
            let arm_count = reader.read_u32()?;
            let mut else_ifs = Vec::with_capacity(arm_count.min(256) as usize);
            for _ in 0..arm_count {
                let condition = decode_expression(reader)?;
                let body = decode_block(reader)?;
                else_ifs.push(ElseIf { condition, body });
            }
            let else_body = decode_block(reader)?;
            Ok(Statement::If {
                condition,
                then_body,
                else_ifs,
                else_body,
            })
        }
        TAG_WHILE => Ok(Statement::While {
            condition: decode_expression(reader)?,
            body: decode_block(reader)?,
        }),
        TAG_FOR => Ok(Statement::For {
            count: decode_expression(reader)?,
            body: decode_block(reader)?,
        }),
        TAG_FOR_EACH => Ok(Statement::ForEach {
            name: reader.read_string()?,
            list: decode_expression(reader)?,
            body: decode_block(reader)?,
        }),
        TAG_INDEX_ASSIGNMENT => Ok(Statement::IndexAssignment {
            name: reader.read_string()?,
            index: decode_expression(reader)?,
            value: decode_expression(reader)?,
        }),
        TAG_RETURN => Ok(Statement::Return(decode_expression(reader)?)),
        TAG_OUTPUT => Ok(Statement::Output(decode_expression(reader)?)),
        TAG_TOGGLE => Ok(Statement::Toggle(reader.read_string()?)),
        TAG_BREAK => Ok(Statement::Break),
        // A bare function-call node is accepted at statement position.
        TAG_FUNCTION_CALL => {
            let call = decode_function_call(reader)?;
            Ok(Statement::Call(call))
        }
        other => Err(BytecodeError::UnknownTag(other)),
    }
}

fn decode_function_call(reader: &mut Reader) -> Result<Expression, BytecodeError> {
    let name = reader.read_string()?;
    let arg_count = reader.read_u32()?;
    let mut args = Vec::with_capacity(arg_count.min(256) as usize);
    for _ in 0..arg_count {
        args.push(decode_expression(reader)?);
    }
    Ok(Expression::FunctionCall { name, args })
}

fn decode_expression(reader: &mut Reader) -> Result<Expression, BytecodeError> {
    let tag = reader.read_u8()?;
    match tag {
        TAG_NUMBER => Ok(Expression::NumberLiteral(reader.read_f64()?)),
        TAG_STRING => Ok(Expression::StringLiteral(reader.read_string()?)),
        TAG_BOOL => Ok(Expression::BoolLiteral(reader.read_bool()?)),
        TAG_LIST => {
            let count = reader.read_u32()?;
            let mut elements = Vec::with_capacity(count.min(1024) as usize);
            for _ in 0..count {
                elements.push(decode_expression(reader)?);
            }
            Ok(Expression::ListLiteral(elements))
        }
        TAG_IDENTIFIER => Ok(Expression::Identifier(reader.read_string()?)),
        TAG_BINARY => {
            let symbol = reader.read_string()?;
            let op = BinaryOp::from_symbol(&symbol)
                .ok_or(BytecodeError::UnknownTag(TAG_BINARY))?;
            Ok(Expression::Binary {
                op,
                left: Box::new(decode_expression(reader)?),
                right: Box::new(decode_expression(reader)?),
            })
        }
        TAG_UNARY => {
            let symbol = reader.read_string()?;
            let op = UnaryOp::from_symbol(&symbol)
                .ok_or(BytecodeError::UnknownTag(TAG_UNARY))?;
            Ok(Expression::Unary {
                op,
                operand: Box::new(decode_expression(reader)?),
            })
        }
        TAG_FUNCTION_CALL => decode_function_call(reader),
        TAG_INDEX => Ok(Expression::Index {
            list: Box::new(decode_expression(reader)?),
            index: Box::new(decode_expression(reader)?),
        }),
        TAG_LENGTH => Ok(Expression::Length(Box::new(decode_expression(reader)?))),
        TAG_LOCATION => Ok(Expression::Location(reader.read_string()?)),
        other => Err(BytecodeError::UnknownTag(other)),
    }
}
