//! Rust-native building blocks for the Argos cryptocurrency-network sniffer
//!
//! Argos observes transaction announcements across many peers of a
//! Bitcoin-family network and estimates where each transaction entered the
//! network. This crate re-exports the workspace members; it provides no
//! application of its own.

#[doc(inline)]
pub use argos_codec as codec;

#[doc(inline)]
pub use argos_graph as graph;

#[doc(inline)]
pub use argos_sniffer as sniffer;

#[doc(inline)]
pub use argos_bitcoin as bitcoin;

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn bitcoin_installs_into_a_registry() {
        let mut registry = sniffer::Registry::new();
        bitcoin::install(&mut registry).unwrap();

        assert_eq!(registry.supported_protocols(), vec!["bitcoin"]);
        assert!(registry.peer_constructor("bitcoin").is_ok());
        assert!(registry.seed_provider("bitcoin").is_ok());

        // installing twice trips the duplicate guard
        assert!(matches!(
            bitcoin::install(&mut registry),
            Err(sniffer::RegistryError::AlreadyRegistered(_))
        ));
    }
}
