//! Core data model: tickets, customers, agents, categories and routing rules.
//!
//! These are plain data types with a handful of derived properties. They
//! carry no database or service logic; persistence lives in `repository`,
//! and all the transformation logic (classification, scoring, routing)
//! lives in its own module and operates on these types by value/reference.

mod agent;
mod category;
mod customer;
mod kb;
mod rule;
mod ticket;

pub use agent::{Agent, AgentRole, AgentStatus, WorkingHours};
pub use category::{default_categories, Category};
pub use customer::{Customer, CustomerTier};
pub use kb::{KbDocument, KbDocumentKind, SuggestedResponse, SuggestedResponseSource};
pub use rule::{default_routing_rules, RuleAction, RuleCondition, RoutingRule};
pub use ticket::{Assignment, PriorityFactor, Ticket, TicketPriority, TicketSentiment, TicketStatus};
