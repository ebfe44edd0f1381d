use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::error::{SecurityError, SecurityResult};
use crate::token::Token;
use crate::voter::{Vote, Voter};

/// How supporting voters' votes on a single attribute are aggregated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum DecisionStrategy {
    /// Any `Granted` grants.
    #[default]
    Affirmative,
    /// More `Granted` than `Denied` grants; a tie denies.
    Consensus,
    /// Any `Denied` denies; at least one `Granted` is required.
    Unanimous,
}

impl fmt::Display for DecisionStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Affirmative => "affirmative",
            Self::Consensus => "consensus",
            Self::Unanimous => "unanimous",
        })
    }
}

/// Decides a set of attributes for a token.
pub trait DecisionManager: Send + Sync {
    /// ## Summary
    /// Every attribute must be granted.
    ///
    /// ## Errors
    /// Returns [`SecurityError::AccessDenied`] naming the first attribute, in input
    /// order, that was not granted.
    fn decide_all(
        &self,
        token: &Token,
        attributes: &[String],
        subject: Option<&dyn Any>,
    ) -> SecurityResult<()>;

    /// ## Summary
    /// At least one attribute must be granted.
    ///
    /// ## Errors
    /// Returns [`SecurityError::AccessDeniedAny`] listing every attribute tried.
    fn decide_any(
        &self,
        token: &Token,
        attributes: &[String],
        subject: Option<&dyn Any>,
    ) -> SecurityResult<()>;

    /// ## Summary
    /// The voter-based manager behind this one, if any. Compilation uses it to upgrade
    /// plain role voters when a role hierarchy is in effect.
    fn as_voting(&self) -> Option<&AccessDecisionManager> {
        None
    }
}

/// Voter-based decision manager.
#[derive(Clone)]
pub struct AccessDecisionManager {
    strategy: DecisionStrategy,
    voters: Vec<Arc<dyn Voter>>,
}

impl fmt::Debug for AccessDecisionManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccessDecisionManager")
            .field("strategy", &self.strategy)
            .field(
                "voters",
                &self.voters.iter().map(|v| v.name()).collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl AccessDecisionManager {
    #[must_use]
    pub fn new(strategy: DecisionStrategy, voters: Vec<Arc<dyn Voter>>) -> Self {
        Self { strategy, voters }
    }

    #[must_use]
    pub const fn strategy(&self) -> DecisionStrategy {
        self.strategy
    }

    #[must_use]
    pub fn voters(&self) -> &[Arc<dyn Voter>] {
        &self.voters
    }

    /// ## Summary
    /// Decides a single attribute. Only voters supporting the attribute vote; when every
    /// voter abstains the attribute is denied under every strategy.
    #[must_use]
    pub fn decide(&self, token: &Token, attribute: &str, subject: Option<&dyn Any>) -> bool {
        let mut granted = 0_usize;
        let mut denied = 0_usize;

        for voter in &self.voters {
            if !voter.supports(attribute, subject) {
                continue;
            }
            let vote = voter.vote(token, attribute, subject);
            tracing::trace!(voter = voter.name(), attribute, ?vote, "Voter cast vote");
            match (self.strategy, vote) {
                (DecisionStrategy::Affirmative, Vote::Granted) => return true,
                (DecisionStrategy::Unanimous, Vote::Denied) => return false,
                (_, Vote::Granted) => granted += 1,
                (_, Vote::Denied) => denied += 1,
                (_, Vote::Abstain) => {}
            }
        }

        match self.strategy {
            DecisionStrategy::Affirmative => false,
            DecisionStrategy::Consensus => granted > denied,
            DecisionStrategy::Unanimous => granted > 0,
        }
    }
}

impl DecisionManager for AccessDecisionManager {
    fn decide_all(
        &self,
        token: &Token,
        attributes: &[String],
        subject: Option<&dyn Any>,
    ) -> SecurityResult<()> {
        match attributes
            .iter()
            .find(|attribute| !self.decide(token, attribute, subject))
        {
            Some(attribute) => Err(SecurityError::AccessDenied {
                attribute: attribute.clone(),
            }),
            None => Ok(()),
        }
    }

    fn decide_any(
        &self,
        token: &Token,
        attributes: &[String],
        subject: Option<&dyn Any>,
    ) -> SecurityResult<()> {
        if attributes
            .iter()
            .any(|attribute| self.decide(token, attribute, subject))
        {
            Ok(())
        } else {
            Err(SecurityError::AccessDeniedAny {
                attributes: attributes.to_vec(),
            })
        }
    }

    fn as_voting(&self) -> Option<&AccessDecisionManager> {
        Some(self)
    }
}
