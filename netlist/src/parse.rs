use std::{collections::BTreeMap, fmt::Display, str::FromStr};

use yap::{one_of, types::WithContext, IntoTokens, TokenLocation, Tokens};

use crate::{Cell, Const, Design, MemoryDecl, Module, ParamValue, PortDirection, SigSpec, Trit, Wire};

/// A signal expression as written in the source, before wire names are resolved.
#[derive(Debug, Clone)]
enum SigExpr {
    Const(Const),
    Wire(String, Option<(usize, Option<usize>)>),
    // Parts are in source order, most significant first.
    Concat(Vec<SigExpr>),
}

#[derive(Debug)]
enum WireOption {
    Width(usize),
    Offset(usize),
    Upto,
    Signed,
    Port(PortDirection, usize),
}

#[derive(Debug)]
enum MemoryOption {
    Width(usize),
    Size(usize),
    Offset(i64),
}

#[derive(Debug)]
enum Statement {
    Autoidx,
    Attribute(String, ParamValue),
    Module(String),
    Wire(Vec<WireOption>, String),
    Memory(Vec<MemoryOption>, String),
    Cell(String, String),
    Parameter(String, ParamValue),
    Connect(SigExpr, SigExpr),
    End,
}

#[derive(Debug, Default)]
struct Context {
    design: Design,
    module: Option<Module>,
    cell: Option<Cell>,
    attributes: BTreeMap<String, ParamValue>,
    error: Option<String>,
}

impl Context {
    fn module_mut(&mut self) -> Result<&mut Module, String> {
        self.module.as_mut().ok_or_else(|| "statement outside of a module".to_owned())
    }

    fn resolve(&self, expr: &SigExpr) -> Result<SigSpec, String> {
        let module = self.module.as_ref().ok_or_else(|| "signal outside of a module".to_owned())?;
        match expr {
            SigExpr::Const(value) => Ok(SigSpec::from(value)),
            SigExpr::Wire(name, range) => {
                let wire_id = module.find_wire(name).ok_or_else(|| format!("no wire named {name}"))?;
                let wire = module.wire(wire_id);
                let sig = module.wire_sig(wire_id);
                let Some((first, second)) = *range else {
                    return Ok(sig);
                };
                let position = |index: usize| -> Result<usize, String> {
                    if index < wire.offset || index - wire.offset >= wire.width {
                        return Err(format!("bit {index} is out of range for wire {name}"));
                    }
                    let position = index - wire.offset;
                    Ok(if wire.upto { wire.width - 1 - position } else { position })
                };
                let first = position(first)?;
                let second = match second {
                    Some(second) => position(second)?,
                    None => first,
                };
                Ok(sig.slice(first.min(second)..=first.max(second)))
            }
            SigExpr::Concat(parts) => {
                let mut sig = SigSpec::new();
                for part in parts.iter().rev() {
                    sig.extend(self.resolve(part)?);
                }
                Ok(sig)
            }
        }
    }

    fn apply(&mut self, statement: Statement) -> Result<(), String> {
        match statement {
            Statement::Autoidx => (),
            Statement::Attribute(name, value) => {
                self.attributes.insert(name, value);
            }
            Statement::Module(name) => {
                if self.module.is_some() {
                    return Err(format!("module {name} is nested in another module"));
                }
                let mut module = Module::new(name);
                module.attributes = std::mem::take(&mut self.attributes);
                self.module = Some(module);
            }
            Statement::Wire(options, name) => {
                let mut wire = Wire::new(name, 1);
                wire.attributes = std::mem::take(&mut self.attributes);
                for option in options {
                    match option {
                        WireOption::Width(width) => wire.width = width,
                        WireOption::Offset(offset) => wire.offset = offset,
                        WireOption::Upto => wire.upto = true,
                        WireOption::Signed => wire.signed = true,
                        WireOption::Port(direction, port_id) => {
                            wire.port = Some(direction);
                            wire.port_id = port_id;
                        }
                    }
                }
                self.module_mut()?.insert_wire(wire).map_err(|error| error.to_string())?;
            }
            Statement::Memory(options, name) => {
                let mut memory =
                    MemoryDecl { name, width: 1, size: 0, offset: 0, attributes: std::mem::take(&mut self.attributes) };
                for option in options {
                    match option {
                        MemoryOption::Width(width) => memory.width = width,
                        MemoryOption::Size(size) => memory.size = size,
                        MemoryOption::Offset(offset) => memory.offset = offset,
                    }
                }
                self.module_mut()?.add_memory(memory).map_err(|error| error.to_string())?;
            }
            Statement::Cell(kind, name) => {
                self.module_mut()?;
                if self.cell.is_some() {
                    return Err(format!("cell {name} is nested in another cell"));
                }
                let mut cell = Cell::new(name, kind);
                cell.attributes = std::mem::take(&mut self.attributes);
                self.cell = Some(cell);
            }
            Statement::Parameter(name, value) => {
                let cell = self.cell.as_mut().ok_or_else(|| format!("parameter {name} outside of a cell"))?;
                cell.parameters.insert(name, value);
            }
            Statement::Connect(lhs, rhs) => {
                let rhs = self.resolve(&rhs)?;
                if let Some(cell) = self.cell.as_mut() {
                    let SigExpr::Wire(port, None) = lhs else {
                        return Err("cell connections must name a port".to_owned());
                    };
                    cell.set_port(&port, rhs);
                } else {
                    let lhs = self.resolve(&lhs)?;
                    if lhs.len() != rhs.len() {
                        return Err(format!("connection width mismatch: {} and {}", lhs.len(), rhs.len()));
                    }
                    self.module_mut()?.connect(lhs, rhs);
                }
            }
            Statement::End => {
                if let Some(cell) = self.cell.take() {
                    self.module_mut()?.add_cell(cell).map_err(|error| error.to_string())?;
                } else if let Some(module) = self.module.take() {
                    self.design.add_module(module).map_err(|error| error.to_string())?;
                } else {
                    return Err("unexpected end".to_owned());
                }
            }
        }
        Ok(())
    }

    fn finish(self) -> Result<Design, String> {
        if let Some(module) = self.module {
            return Err(format!("module {} is not terminated", module.name));
        }
        Ok(self.design)
    }
}

fn parse_space(t: &mut impl Tokens<Item = char>) -> bool {
    t.skip_while(|c| *c == ' ' || *c == '\t' || *c == '\r') > 0
}

fn parse_comment(t: &mut impl Tokens<Item = char>) -> bool {
    if !t.token('#') {
        return false;
    }
    t.skip_while(|c| *c != '\n');
    true
}

fn parse_blank(t: &mut impl Tokens<Item = char>) -> bool {
    let space = parse_space(t);
    let comment = parse_comment(t);
    space || comment
}

#[must_use]
fn parse_symbol(t: &mut impl Tokens<Item = char>, symbol: char) -> Option<()> {
    if !t.token(symbol) {
        return None;
    }
    Some(())
}

fn parse_decimal<T: FromStr>(t: &mut impl Tokens<Item = char>) -> Option<T> {
    t.take_while(|c| c.is_ascii_digit() || *c == '-').parse::<T, String>().ok()
}

fn parse_keyword(t: &mut impl Tokens<Item = char>) -> Option<String> {
    let name: String = t.take_while(|c| c.is_ascii_alphanumeric() || *c == '_').collect();
    if name.is_empty() {
        return None;
    }
    Some(name)
}

#[must_use]
fn parse_keyword_expect(t: &mut impl Tokens<Item = char>, expected: &str) -> Option<()> {
    let keyword = parse_keyword(t)?;
    if keyword != expected {
        return None;
    }
    Some(())
}

// Escaped identifiers are stored without their leading backslash.
fn parse_ident(t: &mut impl Tokens<Item = char>) -> Option<String> {
    let escaped = match t.next()? {
        '\\' => true,
        '$' => false,
        _ => return None,
    };
    let rest: String = t.take_while(|c| !c.is_whitespace()).collect();
    if rest.is_empty() {
        return None;
    }
    Some(if escaped { rest } else { format!("${rest}") })
}

fn parse_string_char(t: &mut impl Tokens<Item = char>) -> Option<char> {
    match t.next() {
        Some('"' | '\\' | '\n') => None,
        Some(char) => Some(char),
        None => None,
    }
}

fn parse_string_escape(t: &mut impl Tokens<Item = char>) -> Option<char> {
    parse_symbol(t, '\\')?;
    match t.next()? {
        'n' => Some('\n'),
        't' => Some('\t'),
        digit @ '0'..='7' => {
            let mut value = digit.to_digit(8)?;
            for _ in 0..2 {
                match t.peek() {
                    Some(digit @ '0'..='7') => {
                        t.next();
                        value = value * 8 + digit.to_digit(8)?;
                    }
                    _ => break,
                }
            }
            char::from_u32(value)
        }
        char => Some(char),
    }
}

fn parse_string(t: &mut impl Tokens<Item = char>) -> Option<String> {
    parse_symbol(t, '"')?;
    let text = t
        .many(|t| {
            one_of!(t;
                parse_string_char(t),
                parse_string_escape(t)
            )
        })
        .collect::<String>();
    parse_symbol(t, '"')?;
    Some(text)
}

// `N'bits`, most significant bit first.  Short values are extended with zeroes, or with `x` if
// their top bit is undefined.
fn parse_sized_const(t: &mut impl Tokens<Item = char>) -> Option<Const> {
    let width: usize = parse_decimal(t)?;
    parse_symbol(t, '\'')?;
    let bits: String = t.take_while(|c| Trit::from_char(*c).is_some()).collect();
    let value: Const = bits.parse().ok()?;
    let fill = match value.iter().last() {
        Some(Trit::Undef) => Trit::Undef,
        _ => Trit::Zero,
    };
    Some(Const::from_iter(value.iter().chain(std::iter::repeat(fill)).take(width)))
}

fn parse_int_const(t: &mut impl Tokens<Item = char>) -> Option<Const> {
    let value: i64 = parse_decimal(t)?;
    Some(Const::from_int(value, 32))
}

fn parse_const(t: &mut impl Tokens<Item = char>) -> Option<Const> {
    one_of!(t;
        parse_sized_const(t),
        parse_int_const(t)
    )
}

fn parse_param_value(t: &mut impl Tokens<Item = char>) -> Option<ParamValue> {
    one_of!(t;
        parse_string(t).map(ParamValue::String),
        parse_const(t).map(ParamValue::Const)
    )
}

fn parse_range(t: &mut impl Tokens<Item = char>) -> Option<(usize, Option<usize>)> {
    parse_blank(t);
    parse_symbol(t, '[')?;
    let first = parse_decimal(t)?;
    let second = one_of!(t;
        parse_symbol(t, ':').and_then(|()| parse_decimal(t)).map(Some),
        Some(None)
    )?;
    parse_symbol(t, ']')?;
    Some((first, second))
}

fn parse_wire_ref(t: &mut impl Tokens<Item = char>) -> Option<SigExpr> {
    let name = parse_ident(t)?;
    let range = one_of!(t;
        parse_range(t).map(Some),
        Some(None)
    )?;
    Some(SigExpr::Wire(name, range))
}

fn parse_concat(t: &mut impl Tokens<Item = char>) -> Option<SigExpr> {
    parse_symbol(t, '{')?;
    let parts = Vec::from_iter(
        t.many(|t| {
            parse_blank(t);
            parse_sig(t)
        })
        .as_iter(),
    );
    parse_blank(t);
    parse_symbol(t, '}')?;
    Some(SigExpr::Concat(parts))
}

fn parse_sig(t: &mut impl Tokens<Item = char>) -> Option<SigExpr> {
    one_of!(t;
        parse_concat(t),
        parse_const(t).map(SigExpr::Const),
        parse_wire_ref(t)
    )
}

fn parse_wire_option(t: &mut impl Tokens<Item = char>) -> Option<WireOption> {
    fn argument(t: &mut impl Tokens<Item = char>) -> Option<usize> {
        parse_blank(t);
        parse_decimal(t)
    }

    let keyword = parse_keyword(t)?;
    let option = match keyword.as_str() {
        "width" => WireOption::Width(argument(t)?),
        "offset" => WireOption::Offset(argument(t)?),
        "upto" => WireOption::Upto,
        "signed" => WireOption::Signed,
        "input" => WireOption::Port(PortDirection::Input, argument(t)?),
        "output" => WireOption::Port(PortDirection::Output, argument(t)?),
        "inout" => WireOption::Port(PortDirection::Inout, argument(t)?),
        _ => return None,
    };
    parse_blank(t);
    Some(option)
}

fn parse_memory_option(t: &mut impl Tokens<Item = char>) -> Option<MemoryOption> {
    let keyword = parse_keyword(t)?;
    parse_blank(t);
    let option = match keyword.as_str() {
        "width" => MemoryOption::Width(parse_decimal(t)?),
        "size" => MemoryOption::Size(parse_decimal(t)?),
        "offset" => MemoryOption::Offset(parse_decimal(t)?),
        _ => return None,
    };
    parse_blank(t);
    Some(option)
}

fn parse_statement(t: &mut impl Tokens<Item = char>) -> Option<Statement> {
    let keyword = parse_keyword(t)?;
    parse_blank(t);
    let statement = match keyword.as_str() {
        "autoidx" => {
            parse_decimal::<usize>(t)?;
            Statement::Autoidx
        }
        "attribute" => {
            let name = parse_ident(t)?;
            parse_blank(t);
            Statement::Attribute(name, parse_param_value(t)?)
        }
        "module" => Statement::Module(parse_ident(t)?),
        "wire" => {
            let options = Vec::from_iter(t.many(|t| parse_wire_option(t)).as_iter());
            Statement::Wire(options, parse_ident(t)?)
        }
        "memory" => {
            let options = Vec::from_iter(t.many(|t| parse_memory_option(t)).as_iter());
            Statement::Memory(options, parse_ident(t)?)
        }
        "cell" => {
            let kind = parse_ident(t)?;
            parse_blank(t);
            Statement::Cell(kind, parse_ident(t)?)
        }
        "parameter" => {
            t.many(|t| {
                one_of!(t;
                    parse_keyword_expect(t, "signed"),
                    parse_keyword_expect(t, "real")
                )?;
                parse_blank(t);
                Some(())
            })
            .as_iter()
            .count();
            let name = parse_ident(t)?;
            parse_blank(t);
            Statement::Parameter(name, parse_param_value(t)?)
        }
        "connect" => {
            let lhs = parse_sig(t)?;
            parse_blank(t);
            Statement::Connect(lhs, parse_sig(t)?)
        }
        "end" => Statement::End,
        _ => return None,
    };
    parse_blank(t);
    if !t.token('\n') && !t.eof() {
        return None;
    }
    Some(statement)
}

fn parse_line(t: &mut WithContext<impl Tokens<Item = char>, Context>) -> bool {
    parse_blank(t);
    if t.token('\n') {
        return true;
    }
    let Some(statement) = parse_statement(t) else {
        return false;
    };
    match t.context_mut().apply(statement) {
        Ok(()) => true,
        Err(error) => {
            t.context_mut().error = Some(error);
            false
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseError {
    pub line: usize,
    pub message: String,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "line {}: {}", self.line, self.message)
    }
}

impl std::error::Error for ParseError {}

/// Parses a design in RTLIL text form.  Processes must already have been lowered to cells;
/// `process` blocks are rejected.
pub fn parse(source: &str) -> Result<Design, ParseError> {
    let mut tokens = source.into_tokens().with_context(Context::default());
    let mut failed_at = None;
    while !tokens.eof() {
        let location = tokens.location();
        if !parse_line(&mut tokens) {
            failed_at = Some(location.offset());
            break;
        }
    }
    let (_, context) = tokens.into_parts();
    let line_of = |offset: usize| {
        source.as_bytes()[..offset.min(source.len())].iter().filter(|&&byte| byte == b'\n').count() + 1
    };
    if let Some(offset) = failed_at {
        let message = context.error.unwrap_or_else(|| {
            let text = source.get(offset..).and_then(|rest| rest.lines().next()).unwrap_or("").trim();
            if text.starts_with("process") {
                "processes are not supported".to_owned()
            } else {
                format!("syntax error near {text:?}")
            }
        });
        return Err(ParseError { line: line_of(offset), message });
    }
    context.finish().map_err(|message| ParseError { line: line_of(source.len()), message })
}

impl FromStr for Design {
    type Err = ParseError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        parse(source)
    }
}
