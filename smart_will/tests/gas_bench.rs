use smart_will::{SmartWill, SmartWillClient, WillConfig};
use soroban_sdk::testutils::{Address as AddressTrait, EnvTestConfig, Ledger, LedgerInfo};
use soroban_sdk::token::{StellarAssetClient, TokenClient};
use soroban_sdk::{Address, Env, Vec};

fn bench_env() -> Env {
    let env = Env::new_with_config(EnvTestConfig {
        capture_snapshot_at_drop: false,
    });
    env.mock_all_auths();
    set_time(&env, 1_700_000_000);
    let mut budget = env.budget();
    budget.reset_unlimited();
    env
}

fn set_time(env: &Env, timestamp: u64) {
    let proto = env.ledger().protocol_version();
    env.ledger().set(LedgerInfo {
        protocol_version: proto,
        sequence_number: 1,
        timestamp,
        network_id: [0; 32],
        base_reserve: 10,
        min_temp_entry_ttl: 1,
        min_persistent_entry_ttl: 1,
        max_entry_ttl: 3_110_400,
    });
}

fn measure<F, R>(env: &Env, f: F) -> (u64, u64, R)
where
    F: FnOnce() -> R,
{
    let mut budget = env.budget();
    budget.reset_unlimited();
    budget.reset_tracker();
    let result = f();
    let cpu = budget.cpu_instruction_cost();
    let mem = budget.memory_bytes_cost();
    (cpu, mem, result)
}

#[test]
fn bench_execute_distribution_worst_case() {
    let env = bench_env();
    let contract_id = env.register_contract(None, SmartWill);
    let client = SmartWillClient::new(&env, &contract_id);

    let owner = <Address as AddressTrait>::generate(&env);
    let admin = <Address as AddressTrait>::generate(&env);
    let token_contract = env.register_stellar_asset_contract_v2(admin.clone());
    let token = token_contract.address();
    let pool = 1_000_000i128;
    StellarAssetClient::new(&env, &token).mint(&owner, &pool);

    let mut validators = Vec::new(&env);
    let v1 = <Address as AddressTrait>::generate(&env);
    let v2 = <Address as AddressTrait>::generate(&env);
    validators.push_back(v1.clone());
    validators.push_back(v2.clone());

    let config = WillConfig::with_defaults(2);
    client.init(&owner, &token, &validators, &config);

    let beneficiaries = 50u32;
    let mut heirs = std::vec::Vec::new();
    for _ in 0..beneficiaries {
        let heir = <Address as AddressTrait>::generate(&env);
        client.add_beneficiary(&owner, &heir, &(10_000 / beneficiaries));
        heirs.push(heir);
    }
    client.deposit_value(&owner, &pool);

    client.attest_trigger(&v1);
    client.attest_trigger(&v2);
    set_time(&env, 1_700_000_000 + config.lock_duration);

    let caller = <Address as AddressTrait>::generate(&env);
    let (cpu, mem, summary) = measure(&env, || client.execute_distribution(&caller));
    assert_eq!(summary.paid_count, beneficiaries);
    assert_eq!(summary.total_paid, pool);

    let token_client = TokenClient::new(&env, &token);
    assert_eq!(token_client.balance(&heirs[0]), pool / beneficiaries as i128);

    println!(
        r#"{{"contract":"smart_will","method":"execute_distribution","scenario":"50_beneficiaries_equal_shares","cpu":{},"mem":{}}}"#,
        cpu, mem
    );
}

#[test]
fn bench_attest_trigger_at_quorum() {
    let env = bench_env();
    let contract_id = env.register_contract(None, SmartWill);
    let client = SmartWillClient::new(&env, &contract_id);

    let owner = <Address as AddressTrait>::generate(&env);
    let token = <Address as AddressTrait>::generate(&env);

    let mut validators = Vec::new(&env);
    for _ in 0..20 {
        validators.push_back(<Address as AddressTrait>::generate(&env));
    }
    client.init(&owner, &token, &validators, &WillConfig::with_defaults(20));

    for i in 0..19 {
        client.attest_trigger(&validators.get(i).unwrap());
    }

    let last = validators.get(19).unwrap();
    let (cpu, mem, count) = measure(&env, || client.attest_trigger(&last));
    assert_eq!(count, 20);
    assert!(client.is_confirmed());

    println!(
        r#"{{"contract":"smart_will","method":"attest_trigger","scenario":"20th_of_20_validators","cpu":{},"mem":{}}}"#,
        cpu, mem
    );
}
