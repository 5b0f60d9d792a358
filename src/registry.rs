//! The type registry: message types, their discriminators and the memoized
//! field layouts of every record type they reach.
//!
//! A [`Registry`] is built once per session with [`RegistryBuilder`] and is
//! read-only afterwards. Rebuilding means building a new one; share it between
//! connections behind an `Arc`.

use crate::error::{Error, Result};
use crate::shape::{FieldDescriptor, RecordRef, Shape, Value};
use crate::traits::{Message, Record};
use std::any::{Any, TypeId};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::debug;

/// Number of distinct discriminators (one byte).
pub const DISCRIMINATOR_SPACE: usize = 256;

/// Visibility class of a message type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Visibility {
    #[default]
    Public,
    Internal,
}

/// Which message types a registry accepts.
///
/// Restricting to internal types lets a test suite register its own messages
/// without picking up the application's.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VisibilityFilter {
    #[default]
    All,
    PublicOnly,
    InternalOnly,
}

impl VisibilityFilter {
    pub fn accepts(self, visibility: Visibility) -> bool {
        match self {
            VisibilityFilter::All => true,
            VisibilityFilter::PublicOnly => visibility == Visibility::Public,
            VisibilityFilter::InternalOnly => visibility == Visibility::Internal,
        }
    }
}

pub(crate) type DecodeFn = fn(Vec<Value>) -> Result<Box<dyn Any + Send>>;

fn decode_boxed<M: Message>(values: Vec<Value>) -> Result<Box<dyn Any + Send>> {
    Ok(Box::new(M::from_values(values)?))
}

/// The cached field layout of one record type.
pub struct MessageDescriptor {
    type_id: TypeId,
    name: &'static str,
    discriminator: Option<u8>,
    fields: Vec<FieldDescriptor>,
    decode: Option<DecodeFn>,
}

impl MessageDescriptor {
    pub fn type_id(&self) -> TypeId {
        self.type_id
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Set only for top-level message types.
    pub fn discriminator(&self) -> Option<u8> {
        self.discriminator
    }

    pub fn fields(&self) -> &[FieldDescriptor] {
        &self.fields
    }

    pub(crate) fn decoder(&self) -> Option<DecodeFn> {
        self.decode
    }
}

impl std::fmt::Debug for MessageDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDescriptor")
            .field("name", &self.name)
            .field("discriminator", &self.discriminator)
            .field("fields", &self.fields)
            .finish()
    }
}

struct Candidate {
    record: RecordRef,
    explicit: Option<u8>,
    visibility: Visibility,
    decode: DecodeFn,
}

/// Collects candidate message types and builds a [`Registry`].
#[derive(Default)]
pub struct RegistryBuilder {
    candidates: Vec<Candidate>,
    filter: VisibilityFilter,
}

impl RegistryBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Restricts which candidates are registered.
    pub fn visibility(mut self, filter: VisibilityFilter) -> Self {
        self.filter = filter;
        self
    }

    /// Adds `M` as a candidate. Registering a type twice has no effect.
    pub fn register<M: Message>(mut self) -> Self {
        let type_id = TypeId::of::<M>();
        if !self
            .candidates
            .iter()
            .any(|c| c.record.type_id() == type_id)
        {
            self.candidates.push(Candidate {
                record: RecordRef::of::<M>(),
                explicit: M::DISCRIMINATOR,
                visibility: M::VISIBILITY,
                decode: decode_boxed::<M>,
            });
        }
        self
    }

    /// Assigns discriminators and resolves every reachable layout.
    ///
    /// Types with an explicit discriminator are placed first; the rest take the
    /// lowest free byte in registration order.
    pub fn build(self) -> Result<Registry> {
        let filter = self.filter;
        let (explicit, auto): (Vec<_>, Vec<_>) = self
            .candidates
            .into_iter()
            .filter(|c| filter.accepts(c.visibility))
            .partition(|c| c.explicit.is_some());

        if explicit.len() + auto.len() > DISCRIMINATOR_SPACE {
            return Err(Error::RegistryOverflow);
        }

        let mut taken = [false; DISCRIMINATOR_SPACE];
        let mut assigned = Vec::with_capacity(explicit.len() + auto.len());
        for candidate in explicit {
            let id = candidate.explicit.unwrap_or_default();
            if taken[id as usize] {
                return Err(Error::DiscriminatorConflict(id));
            }
            taken[id as usize] = true;
            assigned.push((id, candidate));
        }

        let mut next = 0usize;
        for candidate in auto {
            while next < DISCRIMINATOR_SPACE && taken[next] {
                next += 1;
            }
            if next == DISCRIMINATOR_SPACE {
                return Err(Error::RegistryOverflow);
            }
            taken[next] = true;
            assigned.push((next as u8, candidate));
        }

        let ids: HashMap<TypeId, (u8, DecodeFn)> = assigned
            .iter()
            .map(|(id, c)| (c.record.type_id(), (*id, c.decode)))
            .collect();

        let mut scanner = Scanner {
            ids: &ids,
            by_type: HashMap::new(),
            in_progress: HashSet::new(),
        };
        for (_, candidate) in &assigned {
            scanner.scan(&candidate.record)?;
        }

        let by_type = scanner.by_type;
        let mut by_discriminator = HashMap::with_capacity(assigned.len());
        for (id, candidate) in &assigned {
            if let Some(descriptor) = by_type.get(&candidate.record.type_id()) {
                by_discriminator.insert(*id, Arc::clone(descriptor));
                debug!(
                    "Message type {} has been registered as {}",
                    candidate.record.name(),
                    id
                );
            }
        }

        Ok(Registry {
            by_discriminator,
            by_type,
        })
    }
}

struct Scanner<'a> {
    ids: &'a HashMap<TypeId, (u8, DecodeFn)>,
    by_type: HashMap<TypeId, Arc<MessageDescriptor>>,
    in_progress: HashSet<TypeId>,
}

impl Scanner<'_> {
    /// Builds the descriptor for `record` after those of every record type it
    /// reaches. Each type is scanned at most once.
    fn scan(&mut self, record: &RecordRef) -> Result<()> {
        let type_id = record.type_id();
        if self.by_type.contains_key(&type_id) {
            return Ok(());
        }
        if !self.in_progress.insert(type_id) {
            return Err(Error::RecursiveRecord(record.name()));
        }

        let fields = record.layout();
        for field in &fields {
            self.scan_shape(&field.shape)?;
        }

        let (discriminator, decode) = match self.ids.get(&type_id) {
            Some((id, decode)) => (Some(*id), Some(*decode)),
            None => (None, None),
        };
        self.in_progress.remove(&type_id);
        self.by_type.insert(
            type_id,
            Arc::new(MessageDescriptor {
                type_id,
                name: record.name(),
                discriminator,
                fields,
                decode,
            }),
        );
        Ok(())
    }

    fn scan_shape(&mut self, shape: &Shape) -> Result<()> {
        match shape {
            Shape::Record(nested) => self.scan(nested),
            Shape::Array(element) => self.scan_shape(element),
            Shape::Scalar(_) | Shape::String | Shape::Dynamic => Ok(()),
        }
    }
}

/// Lookup tables from discriminator and from type to descriptor.
#[derive(Debug)]
pub struct Registry {
    by_discriminator: HashMap<u8, Arc<MessageDescriptor>>,
    by_type: HashMap<TypeId, Arc<MessageDescriptor>>,
}

impl Registry {
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::new()
    }

    pub fn by_discriminator(&self, discriminator: u8) -> Option<&Arc<MessageDescriptor>> {
        self.by_discriminator.get(&discriminator)
    }

    /// Descriptor of any registered record type, nested or top-level.
    pub fn by_type(&self, type_id: TypeId) -> Option<&Arc<MessageDescriptor>> {
        self.by_type.get(&type_id)
    }

    pub fn descriptor_of<R: Record>(&self) -> Option<&Arc<MessageDescriptor>> {
        self.by_type(TypeId::of::<R>())
    }

    pub fn discriminator_of<M: Message>(&self) -> Option<u8> {
        self.descriptor_of::<M>().and_then(|d| d.discriminator())
    }

    /// Number of top-level message types.
    pub fn len(&self) -> usize {
        self.by_discriminator.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_discriminator.is_empty()
    }

    /// Top-level message descriptors in discriminator order.
    pub fn messages(&self) -> impl Iterator<Item = &Arc<MessageDescriptor>> {
        let mut ids: Vec<_> = self.by_discriminator.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter()
            .filter_map(move |id| self.by_discriminator.get(&id))
    }
}
