//! Core document types for the experiment kernel.

pub mod id;
pub mod block;
pub mod page;
pub mod experiment;
pub mod event;

pub use id::{Document, DocumentId, Relation, random_url_safe_id};
pub use block::{
    Block, BlockSettings, BlockType, Section, ResolvedBlock,
    HeroBlock, CallToAction, ContentBlock, AccordionBlock, AccordionItem,
    FaqBlock, FaqItem, StatsBlock, StatItem, FooterBlock, ReusableBlockRef,
};
pub use page::{
    Page, PageVariant, VariantStatus, ReusableBlockDocument, ReusableCategory,
    ResolvedPage, ResolvedPageWithVariant, VariantMeta,
};
pub use experiment::{Experiment, ExperimentStatus, ExperimentVariantEntry};
pub use event::{AnalyticsEvent, EventType, Lead};
