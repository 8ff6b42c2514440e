//! Element resolution over the locator table.
//!
//! For a role, each locator is tried in priority order. All matches of a
//! locator are queried, filtered to visible (and optionally enabled)
//! elements, and the first survivor of the first productive locator wins.
//! "Nothing found" is a value, never an error; a handle that goes stale while
//! it is being filtered is simply ineligible.

use crate::driver::{ElementHandle, UiDriver};
use crate::locator::{LocatorTable, Role, Selector};
use crate::result::AlumnusResult;
use std::fmt;

/// Outcome of probing for a role
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// An eligible element
    Found(ElementHandle),
    /// Elements matched, but none was eligible
    NotInteractable {
        /// Elements any locator matched
        matched: usize,
        /// Of those, how many were visible
        visible: usize,
    },
    /// No locator matched anything
    Absent,
}

impl Resolution {
    /// The element, if one was found
    #[must_use]
    pub fn found(self) -> Option<ElementHandle> {
        match self {
            Self::Found(element) => Some(element),
            _ => None,
        }
    }

    /// Failure classification for reporting
    #[must_use]
    pub const fn failure(&self) -> Option<ResolutionFailure> {
        match self {
            Self::Found(_) => None,
            Self::NotInteractable { .. } => Some(ResolutionFailure::NotInteractable),
            Self::Absent => Some(ResolutionFailure::Absent),
        }
    }
}

/// Why a role could not be resolved
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionFailure {
    /// Nothing on the page matched
    Absent,
    /// Something matched but was hidden or disabled
    NotInteractable,
}

impl fmt::Display for ResolutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Absent => write!(f, "absent"),
            Self::NotInteractable => write!(f, "present but not interactable"),
        }
    }
}

/// Resolves roles to elements through a driver
#[derive(Debug)]
pub struct ElementResolver<'a, D: UiDriver + ?Sized> {
    driver: &'a D,
    table: &'a LocatorTable,
}

impl<'a, D: UiDriver + ?Sized> ElementResolver<'a, D> {
    #[must_use]
    pub const fn new(driver: &'a D, table: &'a LocatorTable) -> Self {
        Self { driver, table }
    }

    /// First eligible element for `role`, or `None`
    pub async fn resolve(&self, role: Role, require_enabled: bool) -> AlumnusResult<Option<ElementHandle>> {
        Ok(self.probe(role, None, require_enabled).await?.found())
    }

    /// Like [`Self::resolve`], restricted to the subtree of `scope`
    pub async fn resolve_within(
        &self,
        scope: &ElementHandle,
        role: Role,
        require_enabled: bool,
    ) -> AlumnusResult<Option<ElementHandle>> {
        Ok(self.probe(role, Some(scope), require_enabled).await?.found())
    }

    /// Resolve with a three-way answer that separates "absent" from
    /// "present but not interactable".
    pub async fn probe(
        &self,
        role: Role,
        scope: Option<&ElementHandle>,
        require_enabled: bool,
    ) -> AlumnusResult<Resolution> {
        let mut matched = 0;
        let mut visible = 0;

        for selector in self.table.get(role) {
            let candidates = match self.query(selector, scope).await {
                Ok(candidates) => candidates,
                Err(e) if e.is_stale() => {
                    tracing::debug!(role = %role, "scope went stale during lookup");
                    return Ok(Resolution::Absent);
                }
                Err(e) => return Err(e),
            };
            matched += candidates.len();

            for candidate in candidates {
                match self.eligibility(&candidate, require_enabled).await? {
                    Eligibility::Eligible => {
                        tracing::debug!(role = %role, locator = %selector, "resolved");
                        return Ok(Resolution::Found(candidate));
                    }
                    Eligibility::VisibleOnly => visible += 1,
                    Eligibility::Hidden => {}
                }
            }
        }

        if matched == 0 {
            Ok(Resolution::Absent)
        } else {
            Ok(Resolution::NotInteractable { matched, visible })
        }
    }

    /// Every eligible element for `role`, across all locators, without
    /// duplicates.
    pub async fn resolve_all_visible(&self, role: Role) -> AlumnusResult<Vec<ElementHandle>> {
        let mut found: Vec<ElementHandle> = Vec::new();
        for selector in self.table.get(role) {
            for candidate in self.driver.find_all(selector).await? {
                if found.iter().any(|f| f.id == candidate.id) {
                    continue;
                }
                if self.eligibility(&candidate, false).await? == Eligibility::Eligible {
                    found.push(candidate);
                }
            }
        }
        Ok(found)
    }

    async fn query(&self, selector: &Selector, scope: Option<&ElementHandle>) -> AlumnusResult<Vec<ElementHandle>> {
        match scope {
            Some(scope) => self.driver.find_within(scope, selector).await,
            None => self.driver.find_all(selector).await,
        }
    }

    async fn eligibility(&self, element: &ElementHandle, require_enabled: bool) -> AlumnusResult<Eligibility> {
        let displayed = match self.driver.is_displayed(element).await {
            Ok(displayed) => displayed,
            Err(e) if e.is_stale() => return Ok(Eligibility::Hidden),
            Err(e) => return Err(e),
        };
        if !displayed {
            return Ok(Eligibility::Hidden);
        }
        if !require_enabled {
            return Ok(Eligibility::Eligible);
        }
        match self.driver.is_enabled(element).await {
            Ok(true) => Ok(Eligibility::Eligible),
            Ok(false) => Ok(Eligibility::VisibleOnly),
            Err(e) if e.is_stale() => Ok(Eligibility::Hidden),
            Err(e) => Err(e),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Eligibility {
    Eligible,
    VisibleOnly,
    Hidden,
}
