//! 合约网关测试：金额换算、提交、确认与失败分类
//!
//! 运行方式：
//! ```bash
//! cargo test --test contract_gateway_test
//! ```

mod common;

use std::sync::Arc;

use common::{account, test_config, wait_until, ConfirmBehavior, MockSigner};
use domain_market::{
    domain::{listing::DomainListing, units::UnitsError, TransactionStatus},
    infrastructure::wallet_provider::WalletError,
    service::contract_gateway::{ContractGateway, ContractMethod, GatewayError},
};
use ethers::{
    abi::{decode, ParamType, Token},
    types::{Bytes, U256},
    utils::id,
};
use tokio_test::{assert_err, assert_ok};

fn gateway() -> ContractGateway {
    ContractGateway::from_config(&test_config().contract).unwrap()
}

fn decode_args(data: &Bytes, params: &[ParamType]) -> Vec<Token> {
    decode(params, &data[4..]).unwrap()
}

#[tokio::test]
async fn test_list_domain_half_ether() {
    let signer = MockSigner::new(account(1));
    let confirmed = gateway()
        .list_domain(signer.as_ref(), "example.eth", "0.5")
        .await
        .unwrap();

    assert_eq!(confirmed.method, ContractMethod::ListDomain);
    assert_eq!(confirmed.block_number, Some(42));

    let tx = signer.last_sent();
    assert_eq!(tx.to, Some(gateway().address().into()));
    assert_eq!(tx.value, Some(U256::zero()));
    let data = tx.data.unwrap();
    assert_eq!(&data[..4], &id("listDomain(string,uint256)")[..]);
    let args = decode_args(&data, &[ParamType::String, ParamType::Uint(256)]);
    assert_eq!(args[0], Token::String("example.eth".into()));
    assert_eq!(
        args[1],
        Token::Uint(U256::from(500_000_000_000_000_000u64))
    );
}

#[tokio::test]
async fn test_list_domain_whole_ether() {
    let signer = MockSigner::new(account(1));
    assert_ok!(gateway().list_domain(signer.as_ref(), "a.com", "1").await);

    let data = signer.last_sent().data.unwrap();
    let args = decode_args(&data, &[ParamType::String, ParamType::Uint(256)]);
    assert_eq!(args[1], Token::Uint(U256::exp10(18)));
}

#[tokio::test]
async fn test_excess_precision_is_rejected_before_submit() {
    let signer = MockSigner::new(account(1));
    let err = gateway()
        .list_domain(signer.as_ref(), "a.com", "0.0000000000000000001")
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        GatewayError::InvalidPrice(UnitsError::TooPrecise { .. })
    ));
    assert_eq!(signer.sent_count(), 0);
}

#[tokio::test]
async fn test_bad_input_is_rejected_before_submit() {
    let signer = MockSigner::new(account(1));
    let gw = gateway();

    for price in ["", "-1", "abc", "1.2.3"] {
        let err = gw.list_domain(signer.as_ref(), "a.com", price).await;
        assert!(
            matches!(err, Err(GatewayError::InvalidPrice(_))),
            "price {price:?} should be rejected"
        );
    }
    assert!(matches!(
        gw.list_domain(signer.as_ref(), "   ", "1").await,
        Err(GatewayError::EmptyDomainName)
    ));
    assert_eq!(signer.sent_count(), 0);
}

#[tokio::test]
async fn test_reverted_receipt() {
    let signer = MockSigner::new(account(1));
    signer.set_confirm(ConfirmBehavior::Revert);

    let err = gateway()
        .list_domain(signer.as_ref(), "taken.com", "2")
        .await
        .unwrap_err();

    assert_eq!(err.outcome(), Some(TransactionStatus::Reverted));
    match err {
        GatewayError::TransactionFailed {
            method, tx_hash, ..
        } => {
            assert_eq!(method, ContractMethod::ListDomain);
            assert!(tx_hash.is_some());
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_revert_during_estimation() {
    let signer = MockSigner::new(account(1));
    signer.reject_send(WalletError::from_rpc(3, "execution reverted: not owner"));

    let err = assert_err!(gateway().list_domain(signer.as_ref(), "a.com", "1").await);
    assert_eq!(err.outcome(), Some(TransactionStatus::Reverted));
}

#[tokio::test]
async fn test_user_rejection() {
    let signer = MockSigner::new(account(1));
    signer.reject_send(WalletError::from_rpc(4001, "User denied transaction signature."));

    let err = gateway()
        .buy_domain(signer.as_ref(), "a.com", "1")
        .await
        .unwrap_err();

    assert_eq!(err.outcome(), Some(TransactionStatus::RejectedByUser));
    assert_eq!(signer.sent_count(), 0);
}

#[tokio::test]
async fn test_network_failures() {
    let gw = gateway();

    let dropped = MockSigner::new(account(1));
    dropped.set_confirm(ConfirmBehavior::Dropped);
    let err = gw
        .list_domain(dropped.as_ref(), "a.com", "1")
        .await
        .unwrap_err();
    assert_eq!(err.outcome(), Some(TransactionStatus::NetworkError));

    let offline = MockSigner::new(account(1));
    offline.reject_send(WalletError::network("connection refused"));
    let err = gw
        .list_domain(offline.as_ref(), "a.com", "1")
        .await
        .unwrap_err();
    assert_eq!(err.outcome(), Some(TransactionStatus::NetworkError));

    let lost = MockSigner::new(account(1));
    lost.set_confirm(ConfirmBehavior::Fail(WalletError::network("timeout")));
    let err = gw
        .list_domain(lost.as_ref(), "a.com", "1")
        .await
        .unwrap_err();
    assert_eq!(err.outcome(), Some(TransactionStatus::NetworkError));
}

#[tokio::test]
async fn test_buy_domain_attaches_value() {
    let signer = MockSigner::new(account(2));
    let confirmed = gateway()
        .buy_domain(signer.as_ref(), "cooldomain.org", "1.2")
        .await
        .unwrap();
    assert_eq!(confirmed.method, ContractMethod::BuyDomain);

    let tx = signer.last_sent();
    assert_eq!(tx.value, Some(U256::from(1_200_000_000_000_000_000u64)));
    let data = tx.data.unwrap();
    assert_eq!(&data[..4], &id("buyDomain(string)")[..]);
    let args = decode_args(&data, &[ParamType::String]);
    assert_eq!(args[0], Token::String("cooldomain.org".into()));
}

#[tokio::test]
async fn test_buy_listing_pays_listing_price() {
    let signer = MockSigner::new(account(2));
    let gw = gateway();

    let mut listing = DomainListing {
        domain_name: "rare.eth".into(),
        price_wei: U256::from(3_000_000_000_000_000u64),
        seller: account(9),
        active: false,
    };
    assert!(matches!(
        gw.buy_listing(signer.as_ref(), &listing).await,
        Err(GatewayError::ListingInactive(name)) if name == "rare.eth"
    ));
    assert_eq!(signer.sent_count(), 0);

    listing.active = true;
    gw.buy_listing(signer.as_ref(), &listing).await.unwrap();
    assert_eq!(signer.last_sent().value, Some(listing.price_wei));
}

#[tokio::test]
async fn test_default_purchase_price() {
    let signer = MockSigner::new(account(2));
    assert_ok!(
        gateway()
            .buy_domain_at_default_price(signer.as_ref(), "legacy.com")
            .await
    );
    assert_eq!(signer.last_sent().value, Some(U256::exp10(18)));
}

#[tokio::test]
async fn test_waits_for_configured_confirmations() {
    let mut config = test_config();
    config.contract.confirmations = 3;
    let gw = ContractGateway::from_config(&config.contract).unwrap();

    let signer = MockSigner::new(account(1));
    gw.list_domain(signer.as_ref(), "a.com", "1").await.unwrap();
    assert_eq!(*signer.confirmations_requested.lock().unwrap(), vec![3]);
}

#[tokio::test]
async fn test_does_not_return_before_confirmation() {
    let signer = MockSigner::new(account(1));
    let gate = signer.gate_confirmation();
    let gw = Arc::new(gateway());

    let task = {
        let signer = signer.clone();
        let gw = gw.clone();
        tokio::spawn(async move { gw.list_domain(signer.as_ref(), "a.com", "1").await })
    };

    // 已提交但未确认
    let s = signer.clone();
    wait_until(move || s.confirmations_requested.lock().unwrap().len() == 1).await;
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    assert!(!task.is_finished());

    gate.notify_one();
    let confirmed = task.await.unwrap().unwrap();
    assert_eq!(confirmed.block_number, Some(42));
}
