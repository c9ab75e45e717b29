//! Static screening of script source before anything is compiled.
//!
//! The screen tokenizes the source (ignoring string literals and comments) and
//! looks every identifier up in the set of forbidden names. Forbidden names
//! come from threat families, each of which can be lifted by a flag, plus the
//! configured `blocked_globals`.

use std::{
    collections::{BTreeMap, BTreeSet},
    sync::LazyLock,
};

use regex::Regex;

use crate::config::{SandboxConfig, SecurityPredicate};

static IDENTIFIER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"[A-Za-z_$][A-Za-z0-9_$]*").expect("invalid identifier pattern")
});

/// A class of dangerous primitives screened as a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ThreatFamily {
    /// Evaluating code built at runtime. Lifted by `allow_eval`.
    DynamicEval,
    /// Creating callables from names or strings. Lifted by `allow_function`.
    DynamicFunction,
    /// Reaching the host's global object or module system. Never lifted.
    HostGlobal,
    /// Reading or rewriting prototype chains. Lifted by
    /// `allow_prototype_pollution`.
    PrototypeMutation,
    /// Network primitives. Lifted by `allow_network_access`.
    Network,
    /// Filesystem primitives. Lifted by `allow_file_system_access`.
    FileSystem,
    /// Loading external modules. Never lifted.
    ModuleLoading,
}

impl ThreatFamily {
    /// Every family.
    pub const ALL: [ThreatFamily; 7] = [
        ThreatFamily::DynamicEval,
        ThreatFamily::DynamicFunction,
        ThreatFamily::HostGlobal,
        ThreatFamily::PrototypeMutation,
        ThreatFamily::Network,
        ThreatFamily::FileSystem,
        ThreatFamily::ModuleLoading,
    ];

    /// Identifiers belonging to the family.
    pub fn identifiers(self) -> &'static [&'static str] {
        match self {
            ThreatFamily::DynamicEval => &["eval"],
            ThreatFamily::DynamicFunction => &["Function", "Fn"],
            ThreatFamily::HostGlobal => &[
                "globalThis",
                "global",
                "window",
                "process",
                "require",
                "module",
                "exports",
                "Deno",
            ],
            ThreatFamily::PrototypeMutation => &[
                "__proto__",
                "prototype",
                "constructor",
                "setPrototypeOf",
                "defineProperty",
                "__defineGetter__",
                "__defineSetter__",
            ],
            ThreatFamily::Network =>
                &["fetch", "XMLHttpRequest", "WebSocket", "EventSource", "navigator"],
            ThreatFamily::FileSystem => &[
                "fs",
                "File",
                "FileReader",
                "readFile",
                "writeFile",
                "readFileSync",
                "writeFileSync",
            ],
            ThreatFamily::ModuleLoading => &["import", "export"],
        }
    }

    /// Short description used in issue messages.
    pub fn description(self) -> &'static str {
        match self {
            ThreatFamily::DynamicEval => "dynamic code evaluation",
            ThreatFamily::DynamicFunction => "dynamic function construction",
            ThreatFamily::HostGlobal => "host global access",
            ThreatFamily::PrototypeMutation => "prototype chain mutation",
            ThreatFamily::Network => "network access",
            ThreatFamily::FileSystem => "file system access",
            ThreatFamily::ModuleLoading => "module loading",
        }
    }

    fn is_lifted(self, flags: &ScreeningFlags) -> bool {
        match self {
            ThreatFamily::DynamicEval => flags.allow_eval,
            ThreatFamily::DynamicFunction => flags.allow_function,
            ThreatFamily::PrototypeMutation => flags.allow_prototype_pollution,
            ThreatFamily::Network => flags.allow_network_access,
            ThreatFamily::FileSystem => flags.allow_file_system_access,
            ThreatFamily::HostGlobal | ThreatFamily::ModuleLoading => false,
        }
    }
}

/// The per-execution switches that lift threat families.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScreeningFlags {
    /// Lifts [`ThreatFamily::DynamicEval`].
    pub allow_eval: bool,
    /// Lifts [`ThreatFamily::DynamicFunction`].
    pub allow_function: bool,
    /// Lifts [`ThreatFamily::PrototypeMutation`].
    pub allow_prototype_pollution: bool,
    /// Lifts [`ThreatFamily::Network`].
    pub allow_network_access: bool,
    /// Lifts [`ThreatFamily::FileSystem`].
    pub allow_file_system_access: bool,
}

impl ScreeningFlags {
    /// Combines the sandbox policy with a script's own access flags.
    pub fn new(config: &SandboxConfig, allow_network: bool, allow_file_system: bool) -> Self {
        Self {
            allow_eval: config.allow_eval,
            allow_function: config.allow_function,
            allow_prototype_pollution: config.allow_prototype_pollution,
            allow_network_access: allow_network,
            allow_file_system_access: allow_file_system,
        }
    }
}

/// The resolved set of forbidden names for one sandbox.
#[derive(Debug, Clone)]
pub struct SecurityPolicy {
    /// Forbidden name to the family it belongs to, `None` for names that are
    /// only in `blocked_globals`.
    forbidden: BTreeMap<String, Option<ThreatFamily>>,
    predicate: Option<SecurityPredicate>,
}

impl SecurityPolicy {
    /// Resolves the policy. Names of lifted families are removed from the
    /// blocked set as well.
    pub fn new(config: &SandboxConfig, flags: ScreeningFlags) -> Self {
        let mut forbidden = BTreeMap::new();
        let mut lifted = BTreeSet::new();

        for family in ThreatFamily::ALL {
            if family.is_lifted(&flags) {
                lifted.extend(family.identifiers().iter().copied());
                continue;
            }
            for name in family.identifiers() {
                forbidden.insert(name.to_string(), Some(family));
            }
        }

        for name in &config.blocked_globals {
            if !lifted.contains(name.as_str()) {
                forbidden.entry(name.clone()).or_insert(None);
            }
        }

        Self { forbidden, predicate: config.security_predicate.clone() }
    }

    /// True if scripts may not reference `name`.
    pub fn is_forbidden(&self, name: &str) -> bool {
        self.forbidden.contains_key(name)
    }

    /// Every name scripts may not reference.
    pub fn forbidden_names(&self) -> BTreeSet<String> {
        self.forbidden.keys().cloned().collect()
    }

    /// Screens `code`, returning one issue per offending identifier in order
    /// of first appearance, followed by the custom predicate's issue.
    pub fn screen(&self, code: &str) -> Vec<String> {
        let stripped = strip_literals_and_comments(code);
        let mut seen = BTreeSet::new();
        let mut issues = Vec::new();

        for token in IDENTIFIER.find_iter(&stripped) {
            let name = token.as_str();
            let Some(family) = self.forbidden.get(name) else {
                continue;
            };
            if !seen.insert(name) {
                continue;
            }
            issues.push(match family {
                Some(family) =>
                    format!("Use of '{}' is not allowed ({})", name, family.description()),
                None => format!("Access to blocked global '{}'", name),
            });
        }

        if let Some(issue) = self.predicate.as_ref().and_then(|p| p.check(code)) {
            issues.push(issue);
        }

        issues
    }
}

/// Blanks out the contents of double-quoted strings, character literals and
/// comments so words inside them are not mistaken for references.
/// Back-tick strings are kept because `${...}` interpolations are code.
fn strip_literals_and_comments(code: &str) -> String {
    #[derive(Clone, Copy, PartialEq)]
    enum State {
        Code,
        Quoted(char),
        LineComment,
        BlockComment,
    }

    let mut out = String::with_capacity(code.len());
    let mut state = State::Code;
    let mut chars = code.chars().peekable();

    while let Some(c) = chars.next() {
        match state {
            State::Code => match c {
                '"' | '\'' => {
                    state = State::Quoted(c);
                    out.push(' ');
                }
                '/' if chars.peek() == Some(&'/') => {
                    chars.next();
                    state = State::LineComment;
                    out.push_str("  ");
                }
                '/' if chars.peek() == Some(&'*') => {
                    chars.next();
                    state = State::BlockComment;
                    out.push_str("  ");
                }
                _ => out.push(c),
            },
            State::Quoted(quote) => {
                if c == '\\' {
                    chars.next();
                    out.push(' ');
                } else if c == quote {
                    state = State::Code;
                } else if c == '\n' {
                    out.push('\n');
                    continue;
                }
                out.push(' ');
            }
            State::LineComment =>
                if c == '\n' {
                    state = State::Code;
                    out.push('\n');
                } else {
                    out.push(' ');
                },
            State::BlockComment => {
                if c == '*' && chars.peek() == Some(&'/') {
                    chars.next();
                    state = State::Code;
                    out.push(' ');
                }
                out.push(if c == '\n' { '\n' } else { ' ' });
            }
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_policy() -> SecurityPolicy {
        SecurityPolicy::new(&SandboxConfig::default(), ScreeningFlags::default())
    }

    #[test]
    fn test_eval_is_flagged() {
        let issues = default_policy().screen("eval('1')");
        assert_eq!(issues.len(), 1);
        assert!(issues[0].contains("'eval'"));
        assert!(issues[0].contains("dynamic code evaluation"));
    }

    #[test]
    fn test_clean_code_passes() {
        assert!(default_policy().screen("let x = Math.floor(2.5); return x + 1;").is_empty());
    }

    #[test]
    fn test_each_identifier_reported_once_in_order() {
        let issues = default_policy().screen("process; window; process.exit()");
        assert_eq!(issues.len(), 2);
        assert!(issues[0].contains("'process'"));
        assert!(issues[1].contains("'window'"));
    }

    #[test]
    fn test_word_boundaries() {
        let policy = default_policy();
        assert!(policy.screen("let evaluation = 1; let processed = 2;").is_empty());
        assert!(!policy.screen("x.__proto__").is_empty());
    }

    #[test]
    fn test_strings_and_comments_are_ignored() {
        let code = r#"
            // eval would be bad
            /* so would process */
            let msg = "the process finished";
            let c = 'e';
            msg
        "#;
        assert!(default_policy().screen(code).is_empty());
    }

    #[test]
    fn test_escaped_quote_does_not_end_string() {
        let code = r#"let s = "a \" eval"; s"#;
        assert!(default_policy().screen(code).is_empty());
    }

    #[test]
    fn test_backtick_interpolation_is_screened() {
        let issues = default_policy().screen("let s = `value: ${process}`; s");
        assert_eq!(issues.len(), 1);
    }

    #[test]
    fn test_allow_eval_lifts_family_and_blocked_entry() {
        let config = SandboxConfig { allow_eval: true, ..Default::default() };
        let policy = SecurityPolicy::new(&config, ScreeningFlags::new(&config, false, false));
        assert!(policy.screen("eval(\"1\")").is_empty());
        assert!(!policy.is_forbidden("eval"));
        assert!(policy.is_forbidden("process"));
    }

    #[test]
    fn test_network_and_file_system_flags() {
        let config = SandboxConfig::default();
        let strict = SecurityPolicy::new(&config, ScreeningFlags::new(&config, false, false));
        assert_eq!(strict.screen("fetch(url); fs.readFile(p)").len(), 3);

        let open = SecurityPolicy::new(&config, ScreeningFlags::new(&config, true, true));
        assert!(open.screen("fetch(url); fs.readFile(p)").is_empty());
    }

    #[test]
    fn test_host_globals_cannot_be_lifted() {
        let config = SandboxConfig {
            allow_eval: true,
            allow_function: true,
            allow_prototype_pollution: true,
            ..Default::default()
        };
        let policy = SecurityPolicy::new(&config, ScreeningFlags::new(&config, true, true));
        assert!(!policy.screen("require").is_empty());
        assert!(!policy.screen("import").is_empty());
    }

    #[test]
    fn test_custom_blocked_global() {
        let mut config = SandboxConfig::default();
        config.blocked_globals.insert("secret".to_string());
        let policy = SecurityPolicy::new(&config, ScreeningFlags::default());
        let issues = policy.screen("return secret;");
        assert_eq!(issues, vec!["Access to blocked global 'secret'".to_string()]);
    }

    #[test]
    fn test_custom_predicate_runs_on_raw_source() {
        let config = SandboxConfig::default().with_security_predicate(SecurityPredicate::new(
            |code| code.contains("while true").then(|| "Unbounded loop".to_string()),
        ));
        let policy = SecurityPolicy::new(&config, ScreeningFlags::default());
        assert_eq!(policy.screen("while true { }"), vec!["Unbounded loop".to_string()]);
    }

    #[test]
    fn test_strip_preserves_line_structure() {
        let stripped = strip_literals_and_comments("a // x\nb \"y\nz\" c");
        assert_eq!(stripped.lines().count(), 3);
        assert!(stripped.contains('a'));
        assert!(stripped.contains('c'));
        assert!(!stripped.contains('x'));
        assert!(!stripped.contains('y'));
    }
}
