//! The closed library of qualified built-ins (`out.Info`, `math.pow`, ...).
//!
//! The registry is static data. The type checker resolves each qualified call
//! to a [`BuiltinId`] once; the evaluator dispatches on it.

use crate::{
    eval::Error,
    host::{Channel, Host},
    types::Type,
    value::Value,
};

/// Dense index into [`ALL`].
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub struct BuiltinId(u8);

impl BuiltinId {
    pub fn get(self) -> &'static Builtin {
        &ALL[self.0 as usize]
    }
}

#[derive(Debug)]
pub struct Builtin {
    pub name: &'static str,
    pub params: Params,
    pub returns: Returns,
    op: Op,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Params {
    /// Any number of arguments, each of the given kind.
    Variadic(ParamKind),
    Fixed(&'static [ParamKind]),
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// `int`, `float` or `str`.
    Printable,
    /// `int` or `float`.
    Numeric,
    /// The given type, subject to the usual widening.
    Exactly(Type),
}

impl ParamKind {
    pub fn accepts(self, actual: Type) -> bool {
        match self {
            ParamKind::Printable => actual != Type::None,
            ParamKind::Numeric => actual.is_numeric(),
            ParamKind::Exactly(ty) => ty.accepts(actual),
        }
    }

    pub fn describe(self) -> &'static str {
        match self {
            ParamKind::Printable => "int, float or str",
            ParamKind::Numeric => "int or float",
            ParamKind::Exactly(ty) => ty.name(),
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Returns {
    Fixed(Type),
    /// `int` if every argument is an `int`, `float` otherwise.
    Numeric,
}

impl Returns {
    pub fn resolve(self, args: impl IntoIterator<Item = Type>) -> Type {
        match self {
            Returns::Fixed(ty) => ty,
            Returns::Numeric => {
                if args.into_iter().all(|ty| ty == Type::Int) {
                    Type::Int
                } else {
                    Type::Float
                }
            }
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Op {
    Write(Channel),
    /// Reads a line, converting it to the given type.
    Input(Type),
    /// Converts a `str` to the given type.
    Convert(Type),
    Pow,
    Sqrt,
    Cbrt,
    Abs,
}

const NUM: ParamKind = ParamKind::Numeric;
const FLOAT: ParamKind = ParamKind::Exactly(Type::Float);

const STR: ParamKind = ParamKind::Exactly(Type::Str);

pub static ALL: [Builtin; 12] = [
    Builtin {
        name: "out.Info",
        params: Params::Variadic(ParamKind::Printable),
        returns: Returns::Fixed(Type::None),
        op: Op::Write(Channel::Info),
    },
    Builtin {
        name: "out.Warn",
        params: Params::Variadic(ParamKind::Printable),
        returns: Returns::Fixed(Type::None),
        op: Op::Write(Channel::Warn),
    },
    Builtin {
        name: "out.Error",
        params: Params::Variadic(ParamKind::Printable),
        returns: Returns::Fixed(Type::None),
        op: Op::Write(Channel::Error),
    },
    Builtin {
        name: "st.getInputFor",
        params: Params::Fixed(&[STR]),
        returns: Returns::Fixed(Type::Str),
        op: Op::Input(Type::Str),
    },
    Builtin {
        name: "math.pow",
        params: Params::Fixed(&[NUM, NUM]),
        returns: Returns::Numeric,
        op: Op::Pow,
    },
    Builtin {
        name: "math.sqrt",
        params: Params::Fixed(&[FLOAT]),
        returns: Returns::Fixed(Type::Float),
        op: Op::Sqrt,
    },
    Builtin {
        name: "math.cbrt",
        params: Params::Fixed(&[FLOAT]),
        returns: Returns::Fixed(Type::Float),
        op: Op::Cbrt,
    },
    Builtin {
        name: "math.abs",
        params: Params::Fixed(&[NUM]),
        returns: Returns::Numeric,
        op: Op::Abs,
    },
    Builtin {
        name: "st.getIntFor",
        params: Params::Fixed(&[STR]),
        returns: Returns::Fixed(Type::Int),
        op: Op::Input(Type::Int),
    },
    Builtin {
        name: "st.getFloatFor",
        params: Params::Fixed(&[STR]),
        returns: Returns::Fixed(Type::Float),
        op: Op::Input(Type::Float),
    },
    Builtin {
        name: "conv.toInt",
        params: Params::Fixed(&[STR]),
        returns: Returns::Fixed(Type::Int),
        op: Op::Convert(Type::Int),
    },
    Builtin {
        name: "conv.toFloat",
        params: Params::Fixed(&[STR]),
        returns: Returns::Fixed(Type::Float),
        op: Op::Convert(Type::Float),
    },
];

static BY_NAME: phf::Map<&'static str, BuiltinId> = phf::phf_map! {
    "out.Info" => BuiltinId(0),
    "out.Warn" => BuiltinId(1),
    "out.Error" => BuiltinId(2),
    "st.getInputFor" => BuiltinId(3),
    "math.pow" => BuiltinId(4),
    "math.sqrt" => BuiltinId(5),
    "math.cbrt" => BuiltinId(6),
    "math.abs" => BuiltinId(7),
    "st.getIntFor" => BuiltinId(8),
    "st.getFloatFor" => BuiltinId(9),
    "conv.toInt" => BuiltinId(10),
    "conv.toFloat" => BuiltinId(11),
};

/// Resolves a qualified name such as `math.pow`.
pub fn lookup(receiver: &str, name: &str) -> Option<BuiltinId> {
    BY_NAME.get(format!("{receiver}.{name}").as_str()).copied()
}

/// Runs a built-in over already evaluated (and type checked) arguments.
pub fn call<'p>(
    id: BuiltinId,
    args: &[Value<'p>],
    host: &mut dyn Host,
) -> Result<Value<'p>, Error> {
    match id.get().op {
        Op::Write(channel) => {
            let line: String = args.iter().map(ToString::to_string).collect();
            host.write_line(channel, &line).map_err(Error::io)?;
            Ok(Value::None)
        }
        Op::Input(ty) => {
            let prompt = args.first().map(ToString::to_string).unwrap_or_default();
            match host.read_line(&prompt).map_err(Error::io)? {
                Some(line) => convert(&line, ty),
                None => Err(Error::EndOfInput),
            }
        }
        Op::Convert(ty) => match &args[0] {
            Value::Str(text) => convert(text, ty),
            other => unreachable!("conversion argument checked to be str, got {other:?}"),
        },
        Op::Pow => match args {
            [Value::Int(base), Value::Int(exp)] => {
                let exp = u32::try_from(*exp).map_err(|_| {
                    if *exp < 0 {
                        Error::NegativeExponent(*exp)
                    } else {
                        Error::Overflow
                    }
                })?;
                base.checked_pow(exp).map(Value::Int).ok_or(Error::Overflow)
            }
            [base, exp] => Ok(Value::Float(f64_of(base).powf(f64_of(exp)))),
            _ => unreachable!("arity is checked statically"),
        },
        Op::Sqrt => {
            let x = f64_of(&args[0]);
            if x < 0.0 {
                return Err(Error::NegativeSqrt);
            }
            Ok(Value::Float(x.sqrt()))
        }
        Op::Cbrt => Ok(Value::Float(f64_of(&args[0]).cbrt())),
        Op::Abs => match args[0] {
            Value::Int(i) => i.checked_abs().map(Value::Int).ok_or(Error::Overflow),
            ref other => Ok(Value::Float(f64_of(other).abs())),
        },
    }
}

/// Whether calling `id` writes a line to one of the output channels.
pub fn produces_output(id: BuiltinId) -> bool {
    matches!(id.get().op, Op::Write(_))
}

/// Converts user supplied text to `ty`. Surrounding whitespace is ignored
/// for numbers.
fn convert<'p>(text: &str, ty: Type) -> Result<Value<'p>, Error> {
    let invalid = || Error::InvalidNumber {
        text: text.into(),
        ty,
    };
    match ty {
        Type::Int => text.trim().parse().map(Value::Int).map_err(|_| invalid()),
        Type::Float => text.trim().parse().map(Value::Float).map_err(|_| invalid()),
        Type::Str | Type::None => Ok(Value::str(text)),
    }
}

fn f64_of(value: &Value<'_>) -> f64 {
    value.as_f64().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::BufferHost;

    fn id(qualified: &str) -> BuiltinId {
        let (receiver, name) = qualified.split_once('.').unwrap();
        lookup(receiver, name).unwrap()
    }

    #[test]
    fn registry_is_consistent() {
        for (index, builtin) in ALL.iter().enumerate() {
            let found = id(builtin.name);
            assert_eq!(found.0 as usize, index, "{}", builtin.name);
        }
        assert_eq!(BY_NAME.len(), ALL.len());
        assert_eq!(lookup("out", "Debug"), None);
        assert_eq!(lookup("math", "info"), None);
    }

    #[test]
    fn write_concatenates_without_separator() {
        let mut host = BufferHost::new();
        let args = [Value::str("x = "), Value::Int(3), Value::Float(0.5)];
        let value = call(id("out.Info"), &args, &mut host).unwrap();
        assert_eq!(value, Value::None);
        assert_eq!(host.output(Channel::Info), ["x = 30.5"]);

        call(id("out.Error"), &[], &mut host).unwrap();
        assert_eq!(host.output(Channel::Error), [""]);
    }

    #[test]
    fn input_reads_one_line() {
        let mut host = BufferHost::with_input(["Ada"]);
        let name = call(id("st.getInputFor"), &[Value::str("name? ")], &mut host);
        assert_eq!(name, Ok(Value::str("Ada")));
        assert_eq!(host.prompts, ["name? "]);

        let again = call(id("st.getInputFor"), &[Value::str("again? ")], &mut host);
        assert_eq!(again, Err(Error::EndOfInput));
    }

    #[test]
    fn numeric_input_is_converted() {
        let mut host = BufferHost::with_input([" 42 ", "-3.5", "x1"]);
        let mut read = |name| call(id(name), &[Value::str("? ")], &mut host);
        assert_eq!(read("st.getIntFor"), Ok(Value::Int(42)));
        assert_eq!(read("st.getFloatFor"), Ok(Value::Float(-3.5)));
        assert_eq!(
            read("st.getIntFor"),
            Err(Error::InvalidNumber {
                text: "x1".into(),
                ty: Type::Int,
            })
        );
        assert_eq!(read("st.getFloatFor"), Err(Error::EndOfInput));
    }

    #[test]
    fn conversions() {
        let mut host = BufferHost::new();
        let mut convert = |name, text| call(id(name), &[Value::str(text)], &mut host);
        assert_eq!(convert("conv.toInt", "-17"), Ok(Value::Int(-17)));
        assert_eq!(convert("conv.toFloat", "2"), Ok(Value::Float(2.0)));
        assert_eq!(convert("conv.toFloat", "1e3"), Ok(Value::Float(1000.0)));
        assert_eq!(
            convert("conv.toInt", "2.5"),
            Err(Error::InvalidNumber {
                text: "2.5".into(),
                ty: Type::Int,
            })
        );
        assert_eq!(
            convert("conv.toInt", "99999999999999999999"),
            Err(Error::InvalidNumber {
                text: "99999999999999999999".into(),
                ty: Type::Int,
            })
        );
        assert!(host.lines.is_empty());
    }

    #[test]
    fn pow() {
        let mut host = BufferHost::new();
        let pow = |a, b, host: &mut BufferHost| call(id("math.pow"), &[a, b], host);
        assert_eq!(pow(Value::Int(2), Value::Int(10), &mut host), Ok(Value::Int(1024)));
        assert_eq!(
            pow(Value::Float(2.0), Value::Int(-1), &mut host),
            Ok(Value::Float(0.5))
        );
        assert_eq!(
            pow(Value::Int(2), Value::Int(-1), &mut host),
            Err(Error::NegativeExponent(-1))
        );
        assert_eq!(
            pow(Value::Int(2), Value::Int(64), &mut host),
            Err(Error::Overflow)
        );
    }

    #[test]
    fn roots_and_abs() {
        let mut host = BufferHost::new();
        let mut one = |name, arg| call(id(name), &[arg], &mut host);
        assert_eq!(one("math.sqrt", Value::Float(9.0)), Ok(Value::Float(3.0)));
        assert_eq!(one("math.sqrt", Value::Int(16)), Ok(Value::Float(4.0)));
        assert_eq!(one("math.sqrt", Value::Float(-1.0)), Err(Error::NegativeSqrt));
        let Ok(Value::Float(root)) = one("math.cbrt", Value::Float(-27.0)) else {
            panic!("cbrt must produce a float");
        };
        assert!((root + 3.0).abs() < 1e-12);
        assert_eq!(one("math.abs", Value::Int(-4)), Ok(Value::Int(4)));
        assert_eq!(one("math.abs", Value::Float(-0.5)), Ok(Value::Float(0.5)));
        assert_eq!(one("math.abs", Value::Int(i64::MIN)), Err(Error::Overflow));
    }

    #[test]
    fn numeric_returns() {
        use Type::*;
        assert_eq!(Returns::Numeric.resolve([Int, Int]), Int);
        assert_eq!(Returns::Numeric.resolve([Int, Float]), Float);
        assert_eq!(Returns::Fixed(Str).resolve([Int]), Str);
    }
}
