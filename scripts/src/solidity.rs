//! Definitions of Solidity constructors and functions called during deployment

use alloy_primitives::{Address, Bytes};
use alloy_sol_types::{sol, SolCall, SolConstructor};

sol! {
    contract Vault {
        constructor(address token);
    }

    contract Controller {
        constructor(address token, address exchangeRate);
    }

    contract ConnectorPlug {
        constructor(address hub, address socket, uint32 siblingChainSlug);
    }

    contract ParallelVault {
        function initialize(address token, address strategy, address owner) external;
    }

    contract AaveStrategy {
        constructor(address token, address pool, address owner);
    }

    contract EthAaveStrategy {
        constructor(address token, address pool, address wstETH, address owner);
    }

    contract TransparentUpgradeableProxy {
        constructor(address logic, address initialOwner, bytes data);
    }
}

/// Constructor arguments of a token's vault on a non-app chain
pub fn vault_args(token: Address) -> Bytes {
    Vault::constructorCall { token }.abi_encode().into()
}

/// Constructor arguments of a token's controller on the app chain, shared by
/// the FiatTokenV2_1 variant
pub fn controller_args(token: Address, exchange_rate: Address) -> Bytes {
    Controller::constructorCall {
        token,
        exchangeRate: exchange_rate,
    }
    .abi_encode()
    .into()
}

/// Constructor arguments of a connector between `hub` and a sibling chain
pub fn connector_args(hub: Address, socket: Address, sibling_chain_slug: u32) -> Bytes {
    ConnectorPlug::constructorCall {
        hub,
        socket,
        siblingChainSlug: sibling_chain_slug,
    }
    .abi_encode()
    .into()
}

/// Constructor arguments of an Aave strategy
pub fn aave_strategy_args(token: Address, pool: Address, owner: Address) -> Bytes {
    AaveStrategy::constructorCall { token, pool, owner }.abi_encode().into()
}

/// Constructor arguments of an ETH Aave strategy
pub fn eth_aave_strategy_args(
    token: Address,
    pool: Address,
    wst_eth: Address,
    owner: Address,
) -> Bytes {
    EthAaveStrategy::constructorCall {
        token,
        pool,
        wstETH: wst_eth,
        owner,
    }
    .abi_encode()
    .into()
}

/// Constructor arguments of a vault proxy: the implementation, the owner of
/// the proxy admin the proxy deploys, and the `initialize` calldata run
/// against the implementation
pub fn vault_proxy_args(
    implementation: Address,
    upgrade_admin: Address,
    token: Address,
    strategy: Address,
    owner: Address,
) -> Bytes {
    let data = ParallelVault::initializeCall {
        token,
        strategy,
        owner,
    }
    .abi_encode();
    TransparentUpgradeableProxy::constructorCall {
        logic: implementation,
        initialOwner: upgrade_admin,
        data: data.into(),
    }
    .abi_encode()
    .into()
}

#[cfg(test)]
mod tests {
    use alloy_primitives::U256;

    use super::*;

    #[test]
    fn connector_args_are_three_words() {
        let args = connector_args(Address::with_last_byte(1), Address::with_last_byte(2), 919);
        assert_eq!(args.len(), 3 * 32);
        assert_eq!(U256::from_be_slice(&args[64..96]), U256::from(919));
    }

    #[test]
    fn proxy_args_embed_initializer() {
        let args = vault_proxy_args(
            Address::with_last_byte(1),
            Address::with_last_byte(2),
            Address::with_last_byte(3),
            Address::with_last_byte(4),
            Address::with_last_byte(5),
        );
        let selector = ParallelVault::initializeCall::SELECTOR;
        assert!(args.windows(4).any(|w| w == selector));
        assert_eq!(&args[12..32], Address::with_last_byte(1).as_slice());
    }
}
