//! Client sync layer for the Helix recruiting assistant: a Socket.IO
//! transport with reconnection, the chat and sequence stores it feeds, and a
//! REST client for the backend's HTTP endpoints.

// Interdiction stricte de pratiques dangereuses ou non idiomatiques
#![deny(warnings)] // Tous les warnings sont traités comme des erreurs
#![deny(unsafe_code)] // Le code unsafe est interdit
#![deny(missing_docs)] // Toute fonction, struct, enum ou module public doit être documenté
#![deny(dead_code)] // Le code inutilisé est interdit
#![deny(non_camel_case_types)]
// Les types doivent suivre la convention CamelCase (exception explicite possible au besoin)

// Options supplémentaires pour ne rien laisser passer
#![deny(unused_imports)] // Les imports inutilisés sont interdits
#![deny(unused_variables)] // Les variables inutilisés sont interdits
#![deny(unused_must_use)] // Oblige à gérer explicitement les Result et Option
#![deny(non_snake_case)] // Les noms de variables et fonctions doivent être en snake_case
#![deny(non_upper_case_globals)] // Les constantes et globals doivent être en MAJUSCULE
#![deny(nonstandard_style)] // Empêche tout style de code non standard
#![forbid(unsafe_op_in_unsafe_fn)]
// Interdit l'utilisation d'unsafe même dans une fonction unsafe

// Clippy pour stricte discipline
#![deny(clippy::all)] // Active toutes les lints Clippy standard
#![deny(clippy::pedantic)] // Active les lints très strictes de Clippy
#![deny(clippy::nursery)] // Active les lints expérimentales
#![deny(clippy::unwrap_used)] // Interdit unwrap()
#![deny(clippy::expect_used)] // Interdit expect()
#![deny(clippy::panic)] // Interdit panic!()
#![deny(clippy::print_stdout)] // Interdit println!() en production
#![deny(clippy::todo)] // Interdit les TODO dans le code
#![deny(clippy::unimplemented)] // Interdit les fonctions non implémentées
#![deny(clippy::missing_const_for_fn)] // Force const lorsque possible
#![deny(clippy::unwrap_in_result)] // Interdit unwrap() sur Result
#![deny(clippy::module_inception)] // Interdit un module ayant le même nom que le crate
#![deny(clippy::redundant_clone)] // Interdit les clones inutiles
#![deny(clippy::shadow_unrelated)] // Interdit le shadowing de variables non liées
#![deny(clippy::too_many_arguments)] // Limite le nombre d’arguments des fonctions
#![deny(clippy::cognitive_complexity)] // Limite la complexité cognitive des fonctions
// Les tests peuvent unwrap()
#![cfg_attr(test, allow(clippy::unwrap_used, clippy::expect_used, clippy::panic))]

// Lints pour sécurité et robustesse
#![deny(overflowing_literals)] // Interdit les littéraux qui débordent

/// REST client for the backend's HTTP endpoints.
#[allow(clippy::module_name_repetitions, clippy::future_not_send)]
pub mod api;
/// Endpoints, timeouts and reconnection settings.
pub mod config;
/// Transport subscriptions wired to the workspace stores.
#[allow(clippy::future_not_send, clippy::missing_const_for_fn)]
pub mod session;
/// Entry helpers to start the `helix` binary.
pub mod start_helix;
/// Line-oriented terminal front-end.
#[allow(
    clippy::print_stdout,
    clippy::cognitive_complexity,
    clippy::future_not_send,
    clippy::too_many_lines,
    clippy::missing_const_for_fn
)]
pub mod terminal;
/// Socket.IO connection, reconnection and event subscriptions.
#[allow(
    clippy::module_name_repetitions,
    clippy::cognitive_complexity,
    clippy::redundant_pub_crate,
    clippy::significant_drop_tightening,
    clippy::missing_const_for_fn,
    clippy::future_not_send,
    clippy::too_many_lines
)]
pub mod transport;
/// Chat log, task projection and the sequence list.
#[allow(
    clippy::module_name_repetitions,
    clippy::doc_markdown,
    clippy::trivially_copy_pass_by_ref,
    clippy::missing_const_for_fn,
    clippy::future_not_send
)]
pub mod workspace;

pub use api::{HelixApi, RequestError};
pub use config::HelixConfig;
pub use session::{Applied, Inbound, Session};
pub use transport::{ConnectionStatus, TransportError, TransportHandle};
pub use workspace::{ChatStore, FieldPrecedence, Projector, SequenceStore};
