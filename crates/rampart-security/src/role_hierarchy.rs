use std::collections::{BTreeSet, HashMap, VecDeque};

/// Directed role graph: each role maps to the roles it directly inherits.
///
/// The graph may contain cycles; expansion tracks visited roles and always terminates.
#[derive(Debug, Clone, Default)]
pub struct RoleHierarchy {
    inherited: HashMap<String, Vec<String>>,
}

impl RoleHierarchy {
    #[must_use]
    pub const fn new(inherited: HashMap<String, Vec<String>>) -> Self {
        Self { inherited }
    }

    /// ## Summary
    /// Adds `inherits` to the roles `role` directly inherits.
    #[must_use]
    pub fn with_inheritance<I, S>(mut self, role: impl Into<String>, inherits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.inherited
            .entry(role.into())
            .or_default()
            .extend(inherits.into_iter().map(Into::into));
        self
    }

    /// ## Summary
    /// Breadth-first closure over the hierarchy starting from `roles`.
    ///
    /// The result contains every seed role plus every role reachable from one, without
    /// duplicates and sorted lexicographically. Empty role names are skipped and roles
    /// without an entry simply inherit nothing.
    #[must_use]
    pub fn expand_roles<I, S>(&self, roles: I) -> Vec<String>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut visited = BTreeSet::new();
        let mut queue = VecDeque::new();

        for role in roles {
            let role = role.as_ref();
            if !role.is_empty() && visited.insert(role.to_owned()) {
                queue.push_back(role.to_owned());
            }
        }

        while let Some(role) = queue.pop_front() {
            let Some(inherits) = self.inherited.get(&role) else {
                continue;
            };
            for parent in inherits {
                if !parent.is_empty() && visited.insert(parent.clone()) {
                    queue.push_back(parent.clone());
                }
            }
        }

        visited.into_iter().collect()
    }
}

impl<K, V, S> FromIterator<(K, V)> for RoleHierarchy
where
    K: Into<String>,
    V: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        iter.into_iter()
            .fold(Self::default(), |hierarchy, (role, inherits)| {
                hierarchy.with_inheritance(role, inherits)
            })
    }
}
