//! Host snapshots and capacity reservation.
//!
//! A [`Node`] is a value copied out of a live [`Host`] at the start of a
//! scheduling pass. Ranking reads it; [`Node::add_container`] is the only
//! mutation, used once a host has been picked so that later decisions see
//! the capacity as taken before the container actually starts.

use std::collections::HashMap;

use crate::error::{PlacementError, PlacementResult};
use crate::request::ResourceRequest;

/// Read accessors of a live host, as exposed by the engine layer.
pub trait Host {
    fn id(&self) -> &str;
    fn ip(&self) -> &str;
    fn addr(&self) -> &str;
    fn name(&self) -> &str;
    fn labels(&self) -> &HashMap<String, String>;
    fn containers(&self) -> Containers;
    fn images(&self) -> Vec<Image>;
    fn used_memory(&self) -> i64;
    fn total_memory(&self) -> i64;
    fn used_cpus(&self) -> i64;
    fn total_cpus(&self) -> i64;
    fn used_blkio(&self) -> i64;
    fn is_healthy(&self) -> bool;
}

/// A container placed on a host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Container {
    pub id: String,
    pub names: Vec<String>,
    pub image: String,
    /// The request the container was created from, if known.
    pub config: Option<ResourceRequest>,
}

impl Container {
    pub fn new(id: impl Into<String>, config: ResourceRequest) -> Self {
        Self {
            id: id.into(),
            names: Vec::new(),
            image: config.image().to_string(),
            config: Some(config),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.names.push(name.into());
        self
    }

    /// Requested memory, cpu shares and blkio weight; zero without a config.
    pub fn requested(&self) -> Usage {
        match &self.config {
            Some(config) => Usage {
                memory: config.memory(),
                cpus: config.cpu_shares(),
                blkio: config.blkio_weight(),
            },
            None => Usage::default(),
        }
    }

    fn has_name(&self, name: &str) -> bool {
        self.names
            .iter()
            .any(|n| n == name || n.trim_start_matches('/') == name)
    }
}

/// Containers on a host, in the order they were added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Containers(Vec<Container>);

impl Containers {
    /// Look up by full id, then by name, then by unambiguous id prefix.
    pub fn get(&self, id_or_name: &str) -> Option<&Container> {
        if id_or_name.is_empty() {
            return None;
        }
        if let Some(c) = self.0.iter().find(|c| c.id == id_or_name) {
            return Some(c);
        }
        if let Some(c) = self.0.iter().find(|c| c.has_name(id_or_name)) {
            return Some(c);
        }
        let mut prefixed = self.0.iter().filter(|c| c.id.starts_with(id_or_name));
        match (prefixed.next(), prefixed.next()) {
            (Some(c), None) => Some(c),
            _ => None,
        }
    }

    pub fn push(&mut self, container: Container) {
        self.0.push(container);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Container> {
        self.0.iter()
    }
}

impl From<Vec<Container>> for Containers {
    fn from(containers: Vec<Container>) -> Self {
        Self(containers)
    }
}

impl FromIterator<Container> for Containers {
    fn from_iter<I: IntoIterator<Item = Container>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<'a> IntoIterator for &'a Containers {
    type Item = &'a Container;
    type IntoIter = std::slice::Iter<'a, Container>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// An image cached on a host.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Image {
    pub id: String,
    pub repo_tags: Vec<String>,
}

impl Image {
    /// Match by id or by repository tag. A name without a tag matches
    /// `name:latest`.
    pub fn matches(&self, id_or_name: &str) -> bool {
        if id_or_name.is_empty() {
            return false;
        }
        if self.id == id_or_name {
            return true;
        }
        let wanted = with_default_tag(id_or_name);
        self.repo_tags.iter().any(|tag| *tag == wanted)
    }
}

fn with_default_tag(name: &str) -> String {
    // The last path segment carries the tag; earlier colons are registry ports.
    let last = name.rsplit('/').next().unwrap_or(name);
    if last.contains(':') {
        name.to_string()
    } else {
        format!("{name}:latest")
    }
}

/// Memory, cpu and blkio amounts, either requested or in use.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub memory: i64,
    pub cpus: i64,
    pub blkio: i64,
}

impl Usage {
    pub fn is_negative(&self) -> bool {
        self.memory < 0 || self.cpus < 0 || self.blkio < 0
    }

    /// Field-wise sum, or `None` if any field overflows.
    pub fn checked_add(self, other: Usage) -> Option<Usage> {
        Some(Usage {
            memory: self.memory.checked_add(other.memory)?,
            cpus: self.cpus.checked_add(other.cpus)?,
            blkio: self.blkio.checked_add(other.blkio)?,
        })
    }

    /// Field-wise sum, clamped at the numeric bounds.
    pub fn saturating_add(self, other: Usage) -> Usage {
        Usage {
            memory: self.memory.saturating_add(other.memory),
            cpus: self.cpus.saturating_add(other.cpus),
            blkio: self.blkio.saturating_add(other.blkio),
        }
    }
}

/// Record of a committed reservation, for observability.
#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub node_id: String,
    pub container_id: String,
    pub requested: Usage,
    pub before: Usage,
    pub after: Usage,
}

/// Point-in-time snapshot of a host used for scheduling.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Node {
    pub id: String,
    pub ip: String,
    pub addr: String,
    pub name: String,
    pub labels: HashMap<String, String>,
    pub containers: Containers,
    pub images: Vec<Image>,

    pub used_memory: i64,
    pub used_cpus: i64,
    /// Blkio has no total: it is accounted, never capped.
    pub used_blkio: i64,
    pub total_memory: i64,
    pub total_cpus: i64,

    pub is_healthy: bool,
}

impl Node {
    /// Copy the current state of a host.
    pub fn from_host<H: Host + ?Sized>(host: &H) -> Self {
        Self {
            id: host.id().to_string(),
            ip: host.ip().to_string(),
            addr: host.addr().to_string(),
            name: host.name().to_string(),
            labels: host.labels().clone(),
            containers: host.containers(),
            images: host.images(),
            used_memory: host.used_memory(),
            used_cpus: host.used_cpus(),
            used_blkio: host.used_blkio(),
            total_memory: host.total_memory(),
            total_cpus: host.total_cpus(),
            is_healthy: host.is_healthy(),
        }
    }

    pub fn container(&self, id_or_name: &str) -> Option<&Container> {
        self.containers.get(id_or_name)
    }

    pub fn image(&self, id_or_name: &str) -> Option<&Image> {
        self.images.iter().find(|image| image.matches(id_or_name))
    }

    pub fn usage(&self) -> Usage {
        Usage {
            memory: self.used_memory,
            cpus: self.used_cpus,
            blkio: self.used_blkio,
        }
    }

    /// Reserve the container's resources and record it on this node.
    ///
    /// The request is checked against total capacity, not against what is
    /// left after current usage, so repeated reservations can push usage
    /// past the totals. Negative amounts are rejected outright.
    pub fn add_container(&mut self, container: &Container) -> PlacementResult<Reservation> {
        let requested = container.requested();
        if requested.is_negative() {
            return Err(PlacementError::InvalidRequest(format!(
                "container {} requests negative resources ({} memory, {} cpus, {} blkio)",
                container.id, requested.memory, requested.cpus, requested.blkio
            )));
        }

        let fits =
            |total: i64, amount: i64| total.checked_sub(amount).is_some_and(|left| left >= 0);
        if !fits(self.total_memory, requested.memory) || !fits(self.total_cpus, requested.cpus) {
            return Err(self.insufficient(requested));
        }

        let before = self.usage();
        let after = before
            .checked_add(requested)
            .ok_or_else(|| self.insufficient(requested))?;
        self.used_memory = after.memory;
        self.used_cpus = after.cpus;
        self.used_blkio = after.blkio;
        self.containers.push(container.clone());

        Ok(Reservation {
            node_id: self.id.clone(),
            container_id: container.id.clone(),
            requested,
            before,
            after,
        })
    }

    fn insufficient(&self, requested: Usage) -> PlacementError {
        PlacementError::InsufficientResources {
            node: self.id.clone(),
            memory: requested.memory,
            cpus: requested.cpus,
            total_memory: self.total_memory,
            total_cpus: self.total_cpus,
        }
    }
}
