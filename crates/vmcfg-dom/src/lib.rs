//! Composition of libvirt domain XML documents from typed elements.
//!
//! A [`Domain`] owns an XML tree and a set of attached [`Element`]s. Each
//! element contributes nodes when attached and removes exactly those nodes
//! when detached, so a domain can be edited incrementally and serialized at
//! any point:
//!
//! ```
//! use vmcfg_dom::{Domain, elements::Name};
//!
//! let mut dom = Domain::new(Default::default());
//! dom.attach_element(Name::new("test-vm")).unwrap();
//! let xml = dom.emit_xml(false).unwrap();
//! assert!(xml.contains("<name>test-vm</name>"));
//! ```
//!
//! Option-heavy structures ([`devices::DriverOptions`], [`devices::IoTune`],
//! [`clock::Clock`]) validate at construction, so an element that exists is
//! an element that can be attached. The only attach-time failures are
//! identity-level (a second copy of a unique element) and value-level (a
//! disk target path already in use).

pub mod clock;
pub mod devices;
pub mod domain;
pub mod element;
pub mod elements;
pub mod error;
pub mod features;
pub mod profiles;
pub mod util;
pub mod volume;

pub use domain::{Domain, DomainKind, RecordId};
pub use element::Element;
pub use error::{Error, Result};
pub use volume::Volume;
