//! Representative values used by generated binding tests.
//!
//! Every generated test looks up its type by public name (`"I64"`,
//! `"DurationVec"`) and feeds `flag` through `-t=<flag>` or an environment
//! variable, then compares against `want` parsed as the same type.

/// One representative literal for a bindable type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestCase {
    /// Text given on the command line or in the environment.
    pub flag: &'static str,
    /// Text of the expected value, parsed with `FlagValue::parse_str`.
    pub want: &'static str,
}

const fn case(flag: &'static str, want: &'static str) -> TestCase {
    TestCase { flag, want }
}

const CASES: &[(&str, TestCase)] = &[
    ("Bool", case("true", "true")),
    ("Char", case("x", "x")),
    ("I8", case("-8", "-8")),
    ("I16", case("0x10", "16")),
    ("I32", case("-32", "-32")),
    ("I64", case("64", "64")),
    ("Isize", case("-7", "-7")),
    ("U16", case("8080", "8080")),
    ("U32", case("0b101", "5")),
    ("U64", case("18446744073709551615", "18446744073709551615")),
    ("Usize", case("42", "42")),
    ("F32", case("1.5", "1.5")),
    ("F64", case("-2.25", "-2.25")),
    ("String", case("hello", "hello")),
    ("Duration", case("1m30s", "90s")),
    ("IpAddr", case("10.0.0.1", "10.0.0.1")),
    ("SocketAddr", case("127.0.0.1:8080", "127.0.0.1:8080")),
    ("PathBuf", case("/tmp/flagbind", "/tmp/flagbind")),
    ("StringVec", case("a,b", "[a,b]")),
    ("BoolVec", case("true,false", "true,false")),
    ("I32Vec", case("1,-2", "1,-2")),
    ("I64Vec", case("1,2,3", "[1,2,3]")),
    ("U64Vec", case("0x1,2", "1,2")),
    ("F64Vec", case("0.5,1.5", "0.5,1.5")),
    ("DurationVec", case("1s,2m", "1s,120s")),
    ("IpAddrVec", case("10.0.0.1,10.0.0.2", "10.0.0.1,10.0.0.2")),
];

/// The test case for the type with public name `public`.
pub fn test_case(public: &str) -> Option<TestCase> {
    CASES
        .iter()
        .find(|(name, _)| *name == public)
        .map(|(_, case)| *case)
}
