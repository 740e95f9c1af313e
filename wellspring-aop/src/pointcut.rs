//! Pointcuts are predicates selecting which methods advice applies to. Each
//! clause is a single predicate over a method descriptor; a [Pointcut] is the
//! conjunction of its clauses. Matching is fully static - it is evaluated once
//! per proxied type, never per call.

use wellspring_ioc::reflect::{MethodDescriptor, TypeInfo, Visibility};

/// A name pattern where `*` matches any (possibly empty) substring, e.g.
/// `*Service`, `shop::*` or `find_*`.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct NamePattern(String);

impl NamePattern {
    pub fn new(pattern: impl Into<String>) -> Self {
        Self(pattern.into())
    }

    pub fn matches(&self, value: &str) -> bool {
        wildcard_match(self.0.as_bytes(), value.as_bytes())
    }
}

impl From<&str> for NamePattern {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

fn wildcard_match(pattern: &[u8], value: &[u8]) -> bool {
    let (mut p, mut v) = (0, 0);
    let mut star = None;
    let mut mark = 0;

    while v < value.len() {
        if p < pattern.len() && (pattern[p] == value[v]) {
            p += 1;
            v += 1;
        } else if p < pattern.len() && pattern[p] == b'*' {
            star = Some(p);
            mark = v;
            p += 1;
        } else if let Some(position) = star {
            p = position + 1;
            mark += 1;
            v = mark;
        } else {
            return false;
        }
    }

    while p < pattern.len() && pattern[p] == b'*' {
        p += 1;
    }

    p == pattern.len()
}

/// A single AND-able predicate over one method of one type.
#[derive(Clone, Debug)]
pub enum PointcutClause {
    /// Method execution pattern: optional visibility, declaring-type pattern
    /// and method-name pattern.
    Execution {
        visibility: Option<Visibility>,
        type_pattern: NamePattern,
        method_pattern: NamePattern,
    },
    /// The declaring type lives within a matching module path.
    Within(NamePattern),
    /// Exact-arity match over parameter type names.
    Args(Vec<NamePattern>),
    /// Runtime type of the target object.
    This(NamePattern),
    /// The declaring type carries the marker.
    TypeMarked(String),
    /// The method carries the marker.
    MethodMarked(String),
}

impl PointcutClause {
    fn matches(&self, info: &TypeInfo, method: &MethodDescriptor) -> bool {
        match self {
            Self::Execution {
                visibility,
                type_pattern,
                method_pattern,
            } => {
                visibility.map_or(true, |required| required == method.visibility)
                    && type_pattern.matches(info.type_name)
                    && method_pattern.matches(method.name)
            }
            Self::Within(pattern) => pattern.matches(info.module_path),
            Self::Args(patterns) => {
                patterns.len() == method.params.len()
                    && patterns
                        .iter()
                        .zip(method.params.iter())
                        .all(|(pattern, param)| pattern.matches(param))
            }
            Self::This(pattern) => pattern.matches(info.type_name),
            Self::TypeMarked(marker) => info.markers.contains(&marker.as_str()),
            Self::MethodMarked(marker) => method.markers.contains(&marker.as_str()),
        }
    }
}

/// Conjunction of clauses. An empty pointcut matches every method.
#[derive(Clone, Debug, Default)]
pub struct Pointcut {
    clauses: Vec<PointcutClause>,
}

impl Pointcut {
    pub fn new() -> Self {
        Default::default()
    }

    /// Shorthand for the common execution-pattern pointcut.
    pub fn execution(
        visibility: Option<Visibility>,
        type_pattern: &str,
        method_pattern: &str,
    ) -> Self {
        Self::new().and(PointcutClause::Execution {
            visibility,
            type_pattern: type_pattern.into(),
            method_pattern: method_pattern.into(),
        })
    }

    pub fn within(module_pattern: &str) -> Self {
        Self::new().and(PointcutClause::Within(module_pattern.into()))
    }

    /// Narrows the pointcut with another clause.
    pub fn and(mut self, clause: PointcutClause) -> Self {
        self.clauses.push(clause);
        self
    }

    /// Static decision for one method of one type.
    pub fn matches(&self, info: &TypeInfo, method: &MethodDescriptor) -> bool {
        self.clauses.iter().all(|clause| clause.matches(info, method))
    }
}

#[cfg(test)]
mod tests {
    use crate::pointcut::{NamePattern, Pointcut, PointcutClause};
    use wellspring_ioc::reflect::{MethodDescriptor, TypeInfo, Visibility};

    static ACCOUNT_SERVICE_INFO: TypeInfo = TypeInfo {
        type_name: "AccountService",
        module_path: "bank::accounts",
        markers: &["service"],
        methods: &[
            MethodDescriptor {
                name: "open_account",
                visibility: Visibility::Public,
                params: &["str"],
                markers: &["audited"],
            },
            MethodDescriptor {
                name: "close_account",
                visibility: Visibility::Public,
                params: &["str", "bool"],
                markers: &[],
            },
            MethodDescriptor {
                name: "recalculate",
                visibility: Visibility::Private,
                params: &[],
                markers: &[],
            },
        ],
    };

    static CLOCK_INFO: TypeInfo = TypeInfo {
        type_name: "Clock",
        module_path: "infra::time",
        markers: &[],
        methods: &[MethodDescriptor {
            name: "now",
            visibility: Visibility::Public,
            params: &[],
            markers: &[],
        }],
    };

    #[test]
    fn should_match_wildcards() {
        assert!(NamePattern::new("*").matches("anything"));
        assert!(NamePattern::new("*Service").matches("AccountService"));
        assert!(NamePattern::new("bank::*").matches("bank::accounts"));
        assert!(NamePattern::new("open_*").matches("open_account"));
        assert!(NamePattern::new("*count*").matches("open_account"));
        assert!(!NamePattern::new("*Service").matches("Clock"));
        assert!(!NamePattern::new("").matches("x"));
        assert!(NamePattern::new("").matches(""));
    }

    #[test]
    fn should_match_all_public_methods_of_type_and_none_of_unrelated_type() {
        let pointcut = Pointcut::execution(Some(Visibility::Public), "AccountService", "*");

        let matched = ACCOUNT_SERVICE_INFO
            .methods
            .iter()
            .filter(|method| pointcut.matches(&ACCOUNT_SERVICE_INFO, method))
            .map(|method| method.name)
            .collect::<Vec<_>>();
        assert_eq!(matched, vec!["open_account", "close_account"]);

        assert!(CLOCK_INFO
            .methods
            .iter()
            .all(|method| !pointcut.matches(&CLOCK_INFO, method)));
    }

    #[test]
    fn should_match_within_module() {
        let pointcut = Pointcut::within("bank::*");

        assert!(pointcut.matches(
            &ACCOUNT_SERVICE_INFO,
            &ACCOUNT_SERVICE_INFO.methods[2]
        ));
        assert!(!pointcut.matches(&CLOCK_INFO, &CLOCK_INFO.methods[0]));
    }

    #[test]
    fn should_match_argument_types_with_exact_arity() {
        let pointcut = Pointcut::new().and(PointcutClause::Args(vec!["str".into()]));

        assert!(pointcut.matches(&ACCOUNT_SERVICE_INFO, &ACCOUNT_SERVICE_INFO.methods[0]));
        // two parameters, pattern expects one
        assert!(!pointcut.matches(&ACCOUNT_SERVICE_INFO, &ACCOUNT_SERVICE_INFO.methods[1]));
    }

    #[test]
    fn should_match_markers() {
        let on_type = Pointcut::new().and(PointcutClause::TypeMarked("service".to_string()));
        let on_method = Pointcut::new().and(PointcutClause::MethodMarked("audited".to_string()));

        assert!(on_type.matches(&ACCOUNT_SERVICE_INFO, &ACCOUNT_SERVICE_INFO.methods[1]));
        assert!(!on_type.matches(&CLOCK_INFO, &CLOCK_INFO.methods[0]));
        assert!(on_method.matches(&ACCOUNT_SERVICE_INFO, &ACCOUNT_SERVICE_INFO.methods[0]));
        assert!(!on_method.matches(&ACCOUNT_SERVICE_INFO, &ACCOUNT_SERVICE_INFO.methods[1]));
    }

    #[test]
    fn should_narrow_with_conjunction() {
        let pointcut = Pointcut::execution(Some(Visibility::Public), "*", "*")
            .and(PointcutClause::This("Account*".into()))
            .and(PointcutClause::Args(vec!["str".into()]));

        assert!(pointcut.matches(&ACCOUNT_SERVICE_INFO, &ACCOUNT_SERVICE_INFO.methods[0]));
        assert!(!pointcut.matches(&ACCOUNT_SERVICE_INFO, &ACCOUNT_SERVICE_INFO.methods[1]));
        assert!(!pointcut.matches(&CLOCK_INFO, &CLOCK_INFO.methods[0]));
    }

    #[test]
    fn should_match_everything_with_empty_pointcut() {
        let pointcut = Pointcut::new();

        assert!(pointcut.matches(&ACCOUNT_SERVICE_INFO, &ACCOUNT_SERVICE_INFO.methods[2]));
    }
}
