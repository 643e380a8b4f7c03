//! MasterChefV3 farm data: reward rate, pool weights and token prices.

use std::{collections::HashMap, sync::Arc};

use alloy::{
    dyn_abi::DynSolValue,
    json_abi::JsonAbi,
    primitives::{Address, U256, U512},
};
use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{debug, error};

use crate::{
    abi::{self, MASTER_CHEF_V3_ABI, PANCAKE_V3_POOL_ABI},
    addresses::{ContractKind, contract_address},
    chains::{BSC_MAINNET, FTM_TESTNET},
    constants::SECONDS_PER_YEAR,
    error::{Error, Result},
    multicall::{
        Aggregator, Call, ContractCall, MulticallV2Options, MulticallV3Options, multicall_v2,
        multicall_v3,
    },
};

pub const SUPPORTED_CHAIN_IDS_V3: [u64; 2] = [FTM_TESTNET.chain_id, BSC_MAINNET.chain_id];

/// USD prices of well-known tokens, used to price farm tokens.
pub type CommonPrice = HashMap<Address, Decimal>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FarmToken {
    pub address: Address,
    pub symbol: String,
    pub decimals: u8,
}

impl FarmToken {
    /// Pool token ordering: the lower address is token0.
    pub fn sorts_before(&self, other: &FarmToken) -> bool {
        self.address < other.address
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmConfigV3 {
    pub pid: u64,
    pub lp_symbol: String,
    pub lp_address: Address,
    pub token: FarmToken,
    pub quote_token: FarmToken,
    pub fee_amount: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmV3DataWithPrice {
    #[serde(flatten)]
    pub config: FarmConfigV3,
    pub v3_pool: Address,
    pub alloc_point: u64,
    pub pool_weight: Decimal,
    pub multiplier: String,
    pub token_price_vs_quote: Decimal,
    pub token_price_busd: Decimal,
    pub quote_token_price_busd: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MasterChefV3Data {
    pub pool_length: u64,
    pub total_alloc_point: u64,
    pub latest_period_cake_per_second: U256,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FarmsV3 {
    pub pool_length: u64,
    pub farms_with_price: Vec<FarmV3DataWithPrice>,
    pub cake_per_second: Decimal,
}

/// Liquidity of a farm's position, in token units.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LpTvl {
    pub token0: Decimal,
    pub token1: Decimal,
    pub updated_at: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CakeAprAndTvl {
    #[serde(rename = "activeTvlUSD")]
    pub active_tvl_usd: Decimal,
    #[serde(rename = "activeTvlUSDUpdatedAt")]
    pub active_tvl_usd_updated_at: String,
    pub cake_apr: Decimal,
}

pub fn is_chain_supported(chain_id: u64) -> bool {
    SUPPORTED_CHAIN_IDS_V3.contains(&chain_id)
}

pub fn is_testnet(chain_id: u64) -> bool {
    chain_id == FTM_TESTNET.chain_id
}

fn uint_at(values: &[DynSolValue], index: usize, function: &'static str) -> Result<U256> {
    values
        .get(index)
        .and_then(DynSolValue::as_uint)
        .map(|(value, _)| value)
        .ok_or(Error::UnexpectedReturn(function))
}

fn u64_at(values: &[DynSolValue], index: usize, function: &'static str) -> Result<u64> {
    let value = uint_at(values, index, function)?;
    u64::try_from(value).map_err(|_| Error::Numeric(format!("{function}: {value} overflows u64")))
}

/// Largest number of decimal places a [`Decimal`] holds.
const MAX_SCALE: u32 = 28;

fn overflow(op: &str, lhs: Decimal, rhs: Decimal) -> Error {
    Error::Numeric(format!("{lhs} {op} {rhs} overflows"))
}

fn mul(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_mul(rhs).ok_or_else(|| overflow("*", lhs, rhs))
}

fn div(lhs: Decimal, rhs: Decimal) -> Result<Decimal> {
    lhs.checked_div(rhs).ok_or_else(|| overflow("/", lhs, rhs))
}

/// Interprets an integer amount with `scale` implied decimals.
///
/// Digits below what a [`Decimal`] can represent are truncated.
fn scaled_decimal(value: U512, scale: u32) -> Result<Decimal> {
    let max_mantissa = U512::from(1u64) << 96;
    let ten = U512::from(10u64);
    let (mut value, mut scale) = (value, scale);
    while scale > MAX_SCALE || (scale > 0 && value >= max_mantissa) {
        value /= ten;
        scale -= 1;
    }
    let raw =
        i128::try_from(value).map_err(|_| Error::Numeric(format!("{value} overflows i128")))?;
    Ok(Decimal::try_from_i128_with_scale(raw, scale)?.normalize())
}

fn pow10(exponent: u32) -> Result<U512> {
    U512::from(10u64)
        .checked_pow(U512::from(exponent))
        .ok_or_else(|| Error::Numeric(format!("10^{exponent} overflows")))
}

/// `latestPeriodCakePerSecond` carries 18 token decimals plus 12 of precision.
pub fn cake_per_second(latest_period_cake_per_second: U256) -> Result<Decimal> {
    scaled_decimal(U512::from(latest_period_cake_per_second), 30)
}

pub fn pool_weight(alloc_point: u64, total_alloc_point: u64) -> Decimal {
    if total_alloc_point == 0 {
        return Decimal::ZERO;
    }
    (Decimal::from(alloc_point) / Decimal::from(total_alloc_point)).normalize()
}

pub fn multiplier(alloc_point: u64, total_alloc_point: u64) -> String {
    if total_alloc_point == 0 {
        return "0X".to_string();
    }
    format!("{}X", (Decimal::from(alloc_point) / Decimal::TEN).normalize())
}

/// Price of token0 denominated in token1, from a pool's `sqrtPriceX96`.
///
/// `sqrtPriceX96² · 10^decimals0 / (2^192 · 10^decimals1)`, computed in
/// integers and truncated to the precision a [`Decimal`] holds.
pub fn token0_price(sqrt_price_x96: U256, decimals0: u8, decimals1: u8) -> Result<Decimal> {
    let sqrt_price = U512::from(sqrt_price_x96);
    let numerator = sqrt_price
        .checked_mul(sqrt_price)
        .and_then(|price| price.checked_mul(pow10(u32::from(decimals0) + MAX_SCALE).ok()?))
        .ok_or_else(|| Error::Numeric(format!("price of {sqrt_price_x96} overflows")))?;
    let denominator = (U512::from(1u64) << 192usize)
        .checked_mul(pow10(u32::from(decimals1))?)
        .ok_or_else(|| Error::Numeric(format!("10^{decimals1} overflows")))?;
    scaled_decimal(numerator / denominator, MAX_SCALE)
}

/// Price of the farm token denominated in its quote token.
pub fn token_price_vs_quote(farm: &FarmConfigV3, sqrt_price_x96: U256) -> Result<Decimal> {
    if farm.token.sorts_before(&farm.quote_token) {
        token0_price(sqrt_price_x96, farm.token.decimals, farm.quote_token.decimals)
    } else {
        let quote_in_token = token0_price(
            sqrt_price_x96,
            farm.quote_token.decimals,
            farm.token.decimals,
        )?;
        if quote_in_token.is_zero() {
            return Ok(Decimal::ZERO);
        }
        Ok(div(Decimal::ONE, quote_in_token)?.normalize())
    }
}

/// USD prices of `(token, quote_token)`.
pub fn farm_prices(
    farm: &FarmConfigV3,
    price_vs_quote: Decimal,
    common_price: &CommonPrice,
) -> Result<(Decimal, Decimal)> {
    let token = common_price.get(&farm.token.address).copied();
    let quote = common_price.get(&farm.quote_token.address).copied();
    Ok(match (token, quote) {
        (Some(token), Some(quote)) => (token, quote),
        (None, Some(quote)) => (mul(price_vs_quote, quote)?.normalize(), quote),
        (Some(token), None) if !price_vs_quote.is_zero() => {
            (token, div(token, price_vs_quote)?.normalize())
        }
        (Some(token), None) => (token, Decimal::ZERO),
        (None, None) => (Decimal::ZERO, Decimal::ZERO),
    })
}

pub fn get_cake_apr(
    pool_weight: Decimal,
    active_tvl_usd: Decimal,
    cake_price_usd: Decimal,
    cake_per_second: Decimal,
) -> Result<Decimal> {
    if active_tvl_usd.is_zero() {
        return Ok(Decimal::ZERO);
    }
    let yearly_reward = mul(
        mul(cake_per_second, Decimal::from(SECONDS_PER_YEAR))?,
        pool_weight,
    )?;
    let apr = div(mul(yearly_reward, cake_price_usd)?, active_tvl_usd)?;
    Ok(mul(apr, Decimal::ONE_HUNDRED)?.normalize())
}

/// TVL of a farm position and the CAKE APR it earns.
pub fn get_cake_apr_and_tvl(
    farm: &FarmV3DataWithPrice,
    lp_tvl: &LpTvl,
    cake_price: Decimal,
    cake_per_second: Decimal,
) -> Result<CakeAprAndTvl> {
    let (token0_price, token1_price) = if farm.config.token.sorts_before(&farm.config.quote_token)
    {
        (farm.token_price_busd, farm.quote_token_price_busd)
    } else {
        (farm.quote_token_price_busd, farm.token_price_busd)
    };
    let token0_tvl = mul(token0_price, lp_tvl.token0)?;
    let token1_tvl = mul(token1_price, lp_tvl.token1)?;
    let tvl = token0_tvl
        .checked_add(token1_tvl)
        .ok_or_else(|| overflow("+", token0_tvl, token1_tvl))?
        .normalize();

    Ok(CakeAprAndTvl {
        active_tvl_usd: tvl,
        active_tvl_usd_updated_at: lp_tvl.updated_at.clone(),
        cake_apr: get_cake_apr(farm.pool_weight, tvl, cake_price, cake_per_second)?,
    })
}

/// Reads farm data from a MasterChefV3 deployment.
#[derive(Debug)]
pub struct FarmFetcherV3<A> {
    aggregator: A,
    master_chefs: HashMap<u64, Address>,
    master_chef_abi: Arc<JsonAbi>,
    pool_abi: Arc<JsonAbi>,
}

impl<A: Aggregator> FarmFetcherV3<A> {
    pub fn new(aggregator: A) -> Result<Self> {
        let master_chefs = SUPPORTED_CHAIN_IDS_V3
            .into_iter()
            .filter_map(|chain| {
                contract_address(ContractKind::MasterChefV3, chain)
                    .ok()
                    .map(|address| (chain, address))
            })
            .collect();
        Ok(Self {
            aggregator,
            master_chefs,
            master_chef_abi: abi::load(MASTER_CHEF_V3_ABI)?,
            pool_abi: abi::load(PANCAKE_V3_POOL_ABI)?,
        })
    }

    pub fn with_master_chef(mut self, chain_id: u64, address: Address) -> Self {
        self.master_chefs.insert(chain_id, address);
        self
    }

    pub fn supported_chain_ids(&self) -> &'static [u64] {
        &SUPPORTED_CHAIN_IDS_V3
    }

    pub fn is_chain_supported(&self, chain_id: u64) -> bool {
        is_chain_supported(chain_id)
    }

    pub fn is_testnet(&self, chain_id: u64) -> bool {
        is_testnet(chain_id)
    }

    pub fn master_chef(&self, chain_id: u64) -> Result<Address> {
        self.master_chefs
            .get(&chain_id)
            .copied()
            .ok_or(Error::UnsupportedChain(chain_id))
    }

    pub async fn fetch_master_chef_data(&self, master_chef: Address) -> Result<MasterChefV3Data> {
        let calls = ["poolLength", "totalAllocPoint", "latestPeriodCakePerSecond"]
            .map(|name| ContractCall::new(master_chef, name));
        let results = multicall_v2(
            &self.aggregator,
            &self.master_chef_abi,
            &calls,
            MulticallV2Options::default(),
        )
        .await?;

        let [pool_length, total_alloc_point, cake_per_second] = results
            .try_into()
            .map_err(|_| Error::UnexpectedReturn("masterChefV3"))?;
        let pool_length = pool_length.ok_or(Error::UnexpectedReturn("poolLength"))?;
        let total_alloc_point =
            total_alloc_point.ok_or(Error::UnexpectedReturn("totalAllocPoint"))?;
        let cake_per_second =
            cake_per_second.ok_or(Error::UnexpectedReturn("latestPeriodCakePerSecond"))?;

        Ok(MasterChefV3Data {
            pool_length: u64_at(&pool_length, 0, "poolLength")?,
            total_alloc_point: u64_at(&total_alloc_point, 0, "totalAllocPoint")?,
            latest_period_cake_per_second: uint_at(
                &cake_per_second,
                0,
                "latestPeriodCakePerSecond",
            )?,
        })
    }

    /// Fetches reward rate and priced farm data for `farms` on `chain_id`.
    pub async fn fetch_farms(
        &self,
        chain_id: u64,
        farms: &[FarmConfigV3],
        common_price: &CommonPrice,
    ) -> Result<FarmsV3> {
        let master_chef = self.master_chef(chain_id)?;
        self.fetch_farms_from(master_chef, farms, common_price)
            .await
            .inspect_err(|err| error!(chain_id, %master_chef, %err, "failed to fetch v3 farms"))
    }

    async fn fetch_farms_from(
        &self,
        master_chef: Address,
        farms: &[FarmConfigV3],
        common_price: &CommonPrice,
    ) -> Result<FarmsV3> {
        let data = self.fetch_master_chef_data(master_chef).await?;
        let cake_per_second = cake_per_second(data.latest_period_cake_per_second)?;
        let farms_with_price = self
            .fetch_farms_with_price(master_chef, farms, data.total_alloc_point, common_price)
            .await?;

        Ok(FarmsV3 {
            pool_length: data.pool_length,
            farms_with_price,
            cake_per_second,
        })
    }

    async fn fetch_farms_with_price(
        &self,
        master_chef: Address,
        farms: &[FarmConfigV3],
        total_alloc_point: u64,
        common_price: &CommonPrice,
    ) -> Result<Vec<FarmV3DataWithPrice>> {
        let pool_info_calls: Vec<_> = farms
            .iter()
            .map(|farm| {
                ContractCall::new(master_chef, "poolInfo")
                    .with_params(vec![DynSolValue::Uint(U256::from(farm.pid), 256)])
            })
            .collect();
        let pool_infos = multicall_v2(
            &self.aggregator,
            &self.master_chef_abi,
            &pool_info_calls,
            MulticallV2Options::default(),
        )
        .await?;

        let mut pools = Vec::with_capacity(farms.len());
        for info in pool_infos {
            let info = info.ok_or(Error::UnexpectedReturn("poolInfo"))?;
            let alloc_point = u64_at(&info, 0, "poolInfo")?;
            let v3_pool = info
                .get(1)
                .and_then(DynSolValue::as_address)
                .ok_or(Error::UnexpectedReturn("poolInfo"))?;
            pools.push((alloc_point, v3_pool));
        }

        let slot0_calls: Vec<_> = pools
            .iter()
            .map(|(_, pool)| Call::new(&self.pool_abi, *pool, "slot0").allow_failure(true))
            .collect();
        let slot0s = multicall_v3(&self.aggregator, &slot0_calls, MulticallV3Options::default())
            .await?;
        debug!(farms = farms.len(), %master_chef, "fetched pool info and prices");

        farms
            .iter()
            .zip(pools)
            .zip(slot0s)
            .map(|((farm, (alloc_point, v3_pool)), slot0)| {
                let price_vs_quote = match slot0 {
                    Some(slot0) => token_price_vs_quote(farm, uint_at(&slot0, 0, "slot0")?)?,
                    None => Decimal::ZERO,
                };
                let (token_price_busd, quote_token_price_busd) =
                    farm_prices(farm, price_vs_quote, common_price)?;
                Ok(FarmV3DataWithPrice {
                    config: farm.clone(),
                    v3_pool,
                    alloc_point,
                    pool_weight: pool_weight(alloc_point, total_alloc_point),
                    multiplier: multiplier(alloc_point, total_alloc_point),
                    token_price_vs_quote: price_vs_quote,
                    token_price_busd,
                    quote_token_price_busd,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use alloy::primitives::address;

    use super::*;

    fn dec(value: &str) -> Decimal {
        Decimal::from_str(value).unwrap()
    }

    fn token(address: Address, symbol: &str, decimals: u8) -> FarmToken {
        FarmToken {
            address,
            symbol: symbol.to_string(),
            decimals,
        }
    }

    fn farm(token: FarmToken, quote_token: FarmToken) -> FarmConfigV3 {
        FarmConfigV3 {
            pid: 1,
            lp_symbol: format!("{}-{}", token.symbol, quote_token.symbol),
            lp_address: Address::ZERO,
            token,
            quote_token,
            fee_amount: 2500,
        }
    }

    const LOW: Address = address!("0x1000000000000000000000000000000000000001");
    const HIGH: Address = address!("0x9000000000000000000000000000000000000009");

    #[test]
    fn supported_chains() {
        assert!(is_chain_supported(4002));
        assert!(is_chain_supported(56));
        assert!(!is_chain_supported(97));
        assert!(is_testnet(4002));
        assert!(!is_testnet(56));
    }

    #[test]
    fn cake_per_second_removes_precision() {
        // 0.5 CAKE/s with 18 decimals and 12 extra digits of precision.
        let raw = U256::from(5u64) * U256::from(10u64).pow(U256::from(29));
        assert_eq!(cake_per_second(raw).unwrap(), dec("0.5"));
        assert_eq!(cake_per_second(U256::ZERO).unwrap(), Decimal::ZERO);
    }

    #[test]
    fn weight_and_multiplier() {
        assert_eq!(pool_weight(25, 100), dec("0.25"));
        assert_eq!(pool_weight(25, 0), Decimal::ZERO);
        assert_eq!(multiplier(25, 100), "2.5X");
        assert_eq!(multiplier(40, 100), "4X");
        assert_eq!(multiplier(40, 0), "0X");
    }

    #[test]
    fn price_from_sqrt_price() {
        // sqrtPriceX96 == 2^96 means a raw price of one.
        let one = U256::from(1u64) << 96;
        assert_eq!(token0_price(one, 18, 18).unwrap(), Decimal::ONE);
        assert_eq!(token0_price(one, 18, 6).unwrap(), dec("1000000000000"));

        let double = U256::from(2u64) << 96;
        let token_is_token0 = farm(token(LOW, "BERA", 18), token(HIGH, "USDT", 18));
        assert_eq!(token_price_vs_quote(&token_is_token0, double).unwrap(), dec("4"));

        let token_is_token1 = farm(token(HIGH, "BERA", 18), token(LOW, "USDT", 18));
        assert_eq!(token_price_vs_quote(&token_is_token1, double).unwrap(), dec("0.25"));
    }

    #[test]
    fn prices_fall_back_on_the_known_side() {
        let f = farm(token(LOW, "BERA", 18), token(HIGH, "USDT", 18));
        let quote_known = CommonPrice::from([(HIGH, Decimal::ONE)]);
        assert_eq!(
            farm_prices(&f, dec("4"), &quote_known).unwrap(),
            (dec("4"), Decimal::ONE)
        );

        let token_known = CommonPrice::from([(LOW, dec("8"))]);
        assert_eq!(
            farm_prices(&f, dec("4"), &token_known).unwrap(),
            (dec("8"), dec("2"))
        );

        assert_eq!(
            farm_prices(&f, dec("4"), &CommonPrice::new()).unwrap(),
            (Decimal::ZERO, Decimal::ZERO)
        );
    }

    #[test]
    fn sqrt_price_keeps_full_precision() {
        // (1 + 2^-48)^2 = 1 + 2^-47 + 2^-96, truncated to 28 places
        let sqrt_price = (U256::from(1u64) << 96) + (U256::from(1u64) << 48);
        assert_eq!(
            token0_price(sqrt_price, 18, 18).unwrap(),
            dec("1.000000000000007105427357601")
        );
        assert_eq!(token0_price(U256::ZERO, 18, 18).unwrap(), Decimal::ZERO);
        assert!(matches!(
            token0_price(U256::MAX, 18, 18),
            Err(Error::Numeric(_))
        ));
    }

    #[test]
    fn cake_per_second_keeps_sub_precision_digits() {
        let raw = U256::from_str("123456789012345678901234567891").unwrap();
        assert_eq!(
            cake_per_second(raw).unwrap(),
            dec("0.1234567890123456789012345678")
        );
    }

    #[test]
    fn dust_inputs_report_overflow_instead_of_panicking() {
        let tiny_tvl = dec("0.000000000000000000000001");
        assert!(matches!(
            get_cake_apr(dec("0.75"), tiny_tvl, dec("2"), dec("0.5")),
            Err(Error::Numeric(_))
        ));

        let f = farm(token(LOW, "WBTC", 8), token(HIGH, "DUST", 18));
        let token_known = CommonPrice::from([(LOW, dec("60000"))]);
        assert!(matches!(
            farm_prices(&f, dec("0.0000000000000000000000001"), &token_known),
            Err(Error::Numeric(_))
        ));
    }

    #[test]
    fn apr_and_tvl() {
        let data = FarmV3DataWithPrice {
            config: farm(token(HIGH, "BERA", 18), token(LOW, "USDT", 18)),
            v3_pool: Address::ZERO,
            alloc_point: 10,
            pool_weight: dec("0.5"),
            multiplier: "1X".to_string(),
            token_price_vs_quote: dec("2"),
            token_price_busd: dec("2"),
            quote_token_price_busd: dec("1"),
        };
        let lp = LpTvl {
            token0: dec("100"),
            token1: dec("50"),
            updated_at: "2023-05-01T00:00:00Z".to_string(),
        };

        // token0 is the quote token (lower address): 100 * 1 + 50 * 2
        let result = get_cake_apr_and_tvl(&data, &lp, dec("2"), dec("0.001")).unwrap();
        assert_eq!(result.active_tvl_usd, dec("200"));
        assert_eq!(result.active_tvl_usd_updated_at, lp.updated_at);
        // 0.001 * 31_536_000 * 0.5 * 2 / 200 * 100
        assert_eq!(result.cake_apr, dec("15768"));

        assert_eq!(
            get_cake_apr(dec("0.5"), Decimal::ZERO, dec("2"), dec("1")).unwrap(),
            Decimal::ZERO
        );
    }
}
