//! Chain parser using nom.
//!
//! Reads the textual form of a fluent chain and replays it onto a
//! [`Query`], so the same builder can be driven from a shell.
//!
//! # Syntax Overview
//!
//! ```text
//! Person.select(id, age).filter(name='Bill', age=18).order_by(name)
//! ──┬─── ───────┬──────── ───────────┬────────────── ──────┬───────
//!   │           │                    │                     └── order_by(cols...)
//!   │           │                    └── filter(col=value, ...)
//!   │           └── select(cols...)
//!   └── Table (also `new('Person')` or `query('Person')`)
//! ```

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char, digit1, multispace0},
    combinator::{map, opt, recognize},
    multi::{many0, separated_list0},
    sequence::{delimited, pair, preceded, separated_pair, tuple},
    IResult,
};

use crate::ast::{Query, Value};
use crate::error::{QchainError, QueryResult};

const METHODS: [&str; 3] = ["select", "filter", "order_by"];

/// One parsed method call.
#[derive(Debug, Clone, PartialEq)]
enum Call {
    Select(Vec<String>),
    Filter(Vec<(String, Value)>),
    OrderBy(Vec<String>),
}

/// Parse a textual chain into a query handle.
pub fn parse(input: &str) -> QueryResult<Query> {
    let input = input.trim();

    match parse_chain(input) {
        Ok(("", (table, calls))) => Ok(replay(table, calls)),
        Ok((remaining, _)) => {
            let position = input.len() - remaining.len();
            let message = match unknown_method(remaining) {
                Some(name) => format!(
                    "Unknown method '{}'. Expected: select, filter, or order_by",
                    name
                ),
                None => format!("Unexpected trailing content: '{}'", remaining),
            };
            Err(QchainError::parse(position, message))
        }
        Err(nom::Err::Error(e)) | Err(nom::Err::Failure(e)) => Err(QchainError::parse(
            input.len() - e.input.len(),
            "Expected a table name",
        )),
        Err(nom::Err::Incomplete(_)) => {
            Err(QchainError::parse(input.len(), "Unexpected end of input"))
        }
    }
}

fn replay(table: String, calls: Vec<Call>) -> Query {
    calls
        .into_iter()
        .fold(Query::new(table), |query, call| match call {
            Call::Select(cols) => query.select(cols),
            Call::Filter(conds) => query.filter(conds),
            Call::OrderBy(cols) => query.order_by(cols),
        })
}

/// Name of the method at the head of `rest`, if it is not one we know.
fn unknown_method(rest: &str) -> Option<&str> {
    let (_, name) = preceded(ws(char('.')), parse_identifier)(rest).ok()?;
    (!METHODS.contains(&name)).then_some(name)
}

fn ws<'a, F, O>(inner: F) -> impl FnMut(&'a str) -> IResult<&'a str, O>
where
    F: FnMut(&'a str) -> IResult<&'a str, O>,
{
    delimited(multispace0, inner, multispace0)
}

/// Parse the table binding followed by any number of calls.
fn parse_chain(input: &str) -> IResult<&str, (String, Vec<Call>)> {
    let (input, table) = parse_table(input)?;
    let (input, calls) = many0(preceded(ws(char('.')), parse_call))(input)?;
    Ok((input, (table.to_string(), calls)))
}

/// Parse `Person`, `'Person'`, `new('Person')` or `query(Person)`.
fn parse_table(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(
            pair(alt((tag("new"), tag("query"))), ws(char('('))),
            alt((parse_quoted, parse_identifier)),
            ws(char(')')),
        ),
        parse_quoted,
        parse_identifier,
    ))(input)
}

/// Parse a single `.method(...)` body (the dot is already consumed).
fn parse_call(input: &str) -> IResult<&str, Call> {
    alt((
        map(preceded(tag("select"), parse_columns), Call::Select),
        map(preceded(tag("order_by"), parse_columns), Call::OrderBy),
        map(preceded(tag("filter"), parse_conditions), Call::Filter),
    ))(input)
}

/// Parse an identifier (table name, column name).
fn parse_identifier(input: &str) -> IResult<&str, &str> {
    take_while1(|c: char| c.is_alphanumeric() || c == '_')(input)
}

/// Parse a single- or double-quoted string, returning its contents.
fn parse_quoted(input: &str) -> IResult<&str, &str> {
    alt((
        delimited(char('\''), take_while(|c| c != '\''), char('\'')),
        delimited(char('"'), take_while(|c| c != '"'), char('"')),
    ))(input)
}

/// Parse `(col, col, ...)`.
fn parse_columns(input: &str) -> IResult<&str, Vec<String>> {
    delimited(
        ws(char('(')),
        separated_list0(
            ws(char(',')),
            map(alt((tag("*"), parse_quoted, parse_identifier)), String::from),
        ),
        ws(char(')')),
    )(input)
}

/// Parse `(col=value, ...)`.
fn parse_conditions(input: &str) -> IResult<&str, Vec<(String, Value)>> {
    delimited(
        ws(char('(')),
        separated_list0(
            ws(char(',')),
            map(
                separated_pair(parse_identifier, ws(char('=')), parse_value),
                |(col, value)| (col.to_string(), value),
            ),
        ),
        ws(char(')')),
    )(input)
}

/// Parse a value.
fn parse_value(input: &str) -> IResult<&str, Value> {
    alt((
        map(parse_quoted, |s| Value::String(s.to_string())),
        parse_number,
        // Bare word: keyword or unquoted string
        map(parse_identifier, |s| match s {
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "null" => Value::Null,
            _ => Value::String(s.to_string()),
        }),
    ))(input)
}

/// Parse a number (integer or float). Integers too large for i64 stay text.
fn parse_number(input: &str) -> IResult<&str, Value> {
    let (rest, num_str) = recognize(tuple((
        opt(char('-')),
        digit1,
        opt(pair(char('.'), digit1)),
    )))(input)?;

    // `18abc` is an identifier, not a number followed by junk
    if rest.starts_with(|c: char| c.is_alphanumeric() || c == '_') {
        return Err(nom::Err::Error(nom::error::Error::new(
            input,
            nom::error::ErrorKind::Digit,
        )));
    }

    let value = if num_str.contains('.') {
        num_str
            .parse()
            .map(Value::Float)
            .unwrap_or_else(|_| Value::String(num_str.to_string()))
    } else {
        num_str
            .parse()
            .map(Value::Int)
            .unwrap_or_else(|_| Value::String(num_str.to_string()))
    };
    Ok((rest, value))
}
