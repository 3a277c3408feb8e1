use std::fmt;
use thiserror::Error;

use super::*;
use crate::registry::types::ReplicaId;

/// Any line a Controller or Dstore may receive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Join { port: ReplicaId },
    Store { name: String, size: u64 },
    StoreAck { name: String },
    Load { name: String },
    Reload { name: String },
    LoadData { name: String },
    Remove { name: String },
    RemoveAck { name: String },
    /// A Dstore answering `REMOVE` for a file it does not hold.
    FileMissing { name: String },
    List,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("empty line")]
    Empty,

    #[error("unknown command '{0}'")]
    UnknownCommand(String),

    #[error("{token} takes {expected} argument(s), got {found}")]
    Arity {
        token: &'static str,
        expected: usize,
        found: usize,
    },

    #[error("{token}: '{value}' is not a valid number")]
    InvalidNumber { token: &'static str, value: String },
}

impl Command {
    pub fn parse(line: &str) -> Result<Self, ParseError> {
        let mut parts = line.split_whitespace();
        let head = parts.next().ok_or(ParseError::Empty)?;
        let args: Vec<&str> = parts.collect();

        let command = match head {
            JOIN => {
                let [port] = expect_args::<1>(JOIN, &args)?;
                Command::Join {
                    port: ReplicaId(parse_number(JOIN, port)?),
                }
            }
            STORE => {
                let [name, size] = expect_args::<2>(STORE, &args)?;
                Command::Store {
                    name: name.to_string(),
                    size: parse_number(STORE, size)?,
                }
            }
            STORE_ACK => Command::StoreAck {
                name: single_name(STORE_ACK, &args)?,
            },
            LOAD => Command::Load {
                name: single_name(LOAD, &args)?,
            },
            RELOAD => Command::Reload {
                name: single_name(RELOAD, &args)?,
            },
            LOAD_DATA => Command::LoadData {
                name: single_name(LOAD_DATA, &args)?,
            },
            REMOVE => Command::Remove {
                name: single_name(REMOVE, &args)?,
            },
            REMOVE_ACK => Command::RemoveAck {
                name: single_name(REMOVE_ACK, &args)?,
            },
            ERROR_FILE_DOES_NOT_EXIST => Command::FileMissing {
                name: single_name(ERROR_FILE_DOES_NOT_EXIST, &args)?,
            },
            LIST => {
                expect_args::<0>(LIST, &args)?;
                Command::List
            }
            other => return Err(ParseError::UnknownCommand(other.to_string())),
        };

        Ok(command)
    }

    pub fn token(&self) -> &'static str {
        match self {
            Command::Join { .. } => JOIN,
            Command::Store { .. } => STORE,
            Command::StoreAck { .. } => STORE_ACK,
            Command::Load { .. } => LOAD,
            Command::Reload { .. } => RELOAD,
            Command::LoadData { .. } => LOAD_DATA,
            Command::Remove { .. } => REMOVE,
            Command::RemoveAck { .. } => REMOVE_ACK,
            Command::FileMissing { .. } => ERROR_FILE_DOES_NOT_EXIST,
            Command::List => LIST,
        }
    }
}

fn expect_args<'a, const N: usize>(
    token: &'static str,
    args: &[&'a str],
) -> Result<[&'a str; N], ParseError> {
    <[&str; N]>::try_from(args).map_err(|_| ParseError::Arity {
        token,
        expected: N,
        found: args.len(),
    })
}

fn single_name(token: &'static str, args: &[&str]) -> Result<String, ParseError> {
    let [name] = expect_args::<1>(token, args)?;
    Ok(name.to_string())
}

fn parse_number<T: std::str::FromStr>(token: &'static str, value: &str) -> Result<T, ParseError> {
    value.parse().map_err(|_| ParseError::InvalidNumber {
        token,
        value: value.to_string(),
    })
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Command::Join { port } => write!(f, "{} {}", JOIN, port),
            Command::Store { name, size } => write!(f, "{} {} {}", STORE, name, size),
            Command::List => f.write_str(LIST),
            Command::StoreAck { name }
            | Command::Load { name }
            | Command::Reload { name }
            | Command::LoadData { name }
            | Command::Remove { name }
            | Command::RemoveAck { name }
            | Command::FileMissing { name } => write!(f, "{} {}", self.token(), name),
        }
    }
}

/// Successful replies sent by the Controller or a Dstore.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    StoreTo(Vec<ReplicaId>),
    StoreComplete,
    LoadFrom { replica: ReplicaId, size: u64 },
    RemoveComplete,
    List(Vec<String>),
    Ack,
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Response::StoreTo(replicas) => {
                f.write_str(STORE_TO)?;
                for replica in replicas {
                    write!(f, " {}", replica)?;
                }
                Ok(())
            }
            Response::StoreComplete => f.write_str(STORE_COMPLETE),
            Response::LoadFrom { replica, size } => write!(f, "{} {} {}", LOAD_FROM, replica, size),
            Response::RemoveComplete => f.write_str(REMOVE_COMPLETE),
            Response::List(names) => {
                f.write_str(LIST)?;
                for name in names {
                    write!(f, " {}", name)?;
                }
                Ok(())
            }
            Response::Ack => f.write_str(ACK),
        }
    }
}
