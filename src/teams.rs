//! Profile teams: on-chain counters merged over the static team list.

use std::{collections::BTreeMap, sync::Arc};

use alloy::{
    dyn_abi::DynSolValue,
    json_abi::JsonAbi,
    primitives::{Address, U256},
};
use serde::Serialize;
use tracing::{debug, warn};

use crate::{
    abi::{self, PANCAKE_PROFILE_ABI},
    addresses::{ContractKind, contract_address},
    chains::{BSC_MAINNET, FTM_TESTNET},
    error::{Error, Result},
    multicall::{Aggregator, CallResult, ContractCall, MulticallV2Options, multicall_v2},
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TeamImages {
    pub lg: String,
    pub md: String,
    pub sm: String,
    pub alt: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Team {
    pub id: u32,
    pub name: String,
    pub description: String,
    pub images: Option<TeamImages>,
    pub background: Option<String>,
    pub text_color: Option<String>,
    pub users: u64,
    pub points: u64,
    /// Only known once on-chain data has been merged in.
    pub is_joinable: Option<bool>,
}

struct TeamDefinition {
    id: u32,
    name: &'static str,
    description: &'static str,
    slug: &'static str,
    text_color: &'static str,
}

const TEAM_DEFINITIONS: [TeamDefinition; 3] = [
    TeamDefinition {
        id: 1,
        name: "Syrup Storm",
        description: "The storm's a-comin! Watch out! These bulls are stampeding in a syrupy surge!",
        slug: "syrup-storm",
        text_color: "#191326",
    },
    TeamDefinition {
        id: 2,
        name: "Fearsome Flippers",
        description: "The flippening is coming. Don't get in these bunnies' way, or you'll get flipped, too!",
        slug: "fearsome-flippers",
        text_color: "#FFFFFF",
    },
    TeamDefinition {
        id: 3,
        name: "Chaotic Cakers",
        description: "Can you stand the heat? Stay out of the kitchen or you might get burned to a crisp!",
        slug: "chaotic-cakers",
        text_color: "#191326",
    },
];

impl From<&TeamDefinition> for Team {
    fn from(def: &TeamDefinition) -> Self {
        let image = |size: &str| format!("{}-{size}.png", def.slug);
        Team {
            id: def.id,
            name: def.name.to_string(),
            description: def.description.to_string(),
            images: Some(TeamImages {
                lg: image("lg"),
                md: image("md"),
                sm: image("sm"),
                alt: image("alt"),
            }),
            background: Some(format!("{}-bg.svg", def.slug)),
            text_color: Some(def.text_color.to_string()),
            users: 0,
            points: 0,
            is_joinable: None,
        }
    }
}

/// The static team list, before any on-chain data.
pub fn teams_list() -> Vec<Team> {
    TEAM_DEFINITIONS.iter().map(Team::from).collect()
}

/// The fields of `getTeamProfile` that override the static list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamProfile {
    pub name: String,
    pub users: u64,
    pub points: u64,
    pub is_joinable: bool,
}

impl TeamProfile {
    /// Reads `(name, description, numberUsers, numberPoints, isJoinable)`.
    pub fn from_outputs(values: &[DynSolValue]) -> Result<Self> {
        const FN: &str = "getTeamProfile";
        let [name, _description, users, points, joinable] = values else {
            return Err(Error::UnexpectedReturn(FN));
        };
        Ok(Self {
            name: name.as_str().ok_or(Error::UnexpectedReturn(FN))?.to_string(),
            users: as_u64(users, FN)?,
            points: as_u64(points, FN)?,
            is_joinable: joinable.as_bool().ok_or(Error::UnexpectedReturn(FN))?,
        })
    }
}

fn as_u64(value: &DynSolValue, function: &'static str) -> Result<u64> {
    let (value, _) = value.as_uint().ok_or(Error::UnexpectedReturn(function))?;
    u64::try_from(value).map_err(|_| Error::Numeric(format!("{value} does not fit in u64")))
}

/// Overlays on-chain data on the static entry for `id`, if there is one.
pub fn merge_team(base: Option<&Team>, id: u32, profile: TeamProfile) -> Team {
    let mut team = base.cloned().unwrap_or_else(|| Team {
        id,
        ..Default::default()
    });
    team.name = profile.name;
    team.users = profile.users;
    team.points = profile.points;
    team.is_joinable = Some(profile.is_joinable);
    team
}

/// Reads teams from a profile contract and merges them with [`teams_list`].
#[derive(Debug)]
pub struct TeamsClient<A> {
    aggregator: A,
    profile: Address,
    abi: Arc<JsonAbi>,
}

impl<A: Aggregator> TeamsClient<A> {
    pub fn new(aggregator: A, profile: Address) -> Result<Self> {
        Ok(Self {
            aggregator,
            profile,
            abi: abi::load(PANCAKE_PROFILE_ABI)?,
        })
    }

    pub fn profile(&self) -> Address {
        self.profile
    }

    async fn call_profile(&self, calls: &[ContractCall]) -> Result<Vec<CallResult>> {
        multicall_v2(
            &self.aggregator,
            &self.abi,
            calls,
            MulticallV2Options::default(),
        )
        .await
    }

    pub async fn number_teams(&self) -> Result<u32> {
        let call = ContractCall::new(self.profile, "numberTeams");
        let outputs = self
            .call_profile(&[call])
            .await?
            .pop()
            .flatten()
            .ok_or(Error::UnexpectedReturn("numberTeams"))?;
        let count = as_u64(
            outputs.first().ok_or(Error::UnexpectedReturn("numberTeams"))?,
            "numberTeams",
        )?;
        u32::try_from(count).map_err(|_| Error::Numeric(format!("{count} teams")))
    }

    fn team_profile_call(&self, id: u32) -> ContractCall {
        ContractCall::new(self.profile, "getTeamProfile")
            .with_params(vec![DynSolValue::Uint(U256::from(id), 256)])
    }

    pub async fn fetch_team(&self, id: u32) -> Result<Team> {
        let outputs = self
            .call_profile(&[self.team_profile_call(id)])
            .await?
            .pop()
            .flatten()
            .ok_or(Error::UnexpectedReturn("getTeamProfile"))?;
        let profile = TeamProfile::from_outputs(&outputs)?;
        let static_teams = teams_list();
        let base = static_teams.iter().find(|team| team.id == id);
        Ok(merge_team(base, id, profile))
    }

    /// Like [`fetch_team`](Self::fetch_team), logging and discarding errors.
    pub async fn get_team(&self, id: u32) -> Option<Team> {
        self.fetch_team(id)
            .await
            .inspect_err(|err| warn!(team = id, %err, "failed to fetch team"))
            .ok()
    }

    /// Static teams keyed by id, with on-chain data merged over them.
    pub async fn fetch_teams(&self) -> Result<BTreeMap<u32, Team>> {
        let mut teams: BTreeMap<u32, Team> = teams_list()
            .into_iter()
            .map(|team| (team.id, team))
            .collect();

        let count = self.number_teams().await?;
        let calls: Vec<_> = (1..=count).map(|id| self.team_profile_call(id)).collect();
        let results = self.call_profile(&calls).await?;
        debug!(profile = %self.profile, count, "fetched team profiles");

        for (id, outputs) in (1..=count).zip(results) {
            let Some(outputs) = outputs else {
                warn!(team = id, "team profile returned no data");
                continue;
            };
            let team = merge_team(teams.get(&id), id, TeamProfile::from_outputs(&outputs)?);
            teams.insert(id, team);
        }
        Ok(teams)
    }

    /// Like [`fetch_teams`](Self::fetch_teams), logging and discarding errors.
    pub async fn get_teams(&self) -> Option<BTreeMap<u32, Team>> {
        self.fetch_teams()
            .await
            .inspect_err(|err| warn!(profile = %self.profile, %err, "failed to fetch teams"))
            .ok()
    }
}

/// The profile contract holding teams on `chain_id`.
pub fn profile_address(chain_id: u64) -> Result<Address> {
    contract_address(ContractKind::SleepProfile, chain_id)
        .or_else(|_| contract_address(ContractKind::PancakeProfile, chain_id))
}

/// Teams of the sleep profile deployed on Fantom testnet.
pub fn bera_teams<A: Aggregator>(aggregator: A) -> Result<TeamsClient<A>> {
    TeamsClient::new(
        aggregator,
        contract_address(ContractKind::SleepProfile, FTM_TESTNET.chain_id)?,
    )
}

/// Teams of the PancakeSwap profile on BNB Smart Chain.
pub fn pancake_teams<A: Aggregator>(aggregator: A) -> Result<TeamsClient<A>> {
    TeamsClient::new(
        aggregator,
        contract_address(ContractKind::PancakeProfile, BSC_MAINNET.chain_id)?,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn profile_outputs(name: &str, users: u64, points: u64, joinable: bool) -> Vec<DynSolValue> {
        vec![
            DynSolValue::String(name.to_string()),
            DynSolValue::String("ignored".to_string()),
            DynSolValue::Uint(U256::from(users), 256),
            DynSolValue::Uint(U256::from(points), 256),
            DynSolValue::Bool(joinable),
        ]
    }

    #[test]
    fn static_list_has_three_teams() {
        let teams = teams_list();
        assert_eq!(teams.iter().map(|t| t.id).collect::<Vec<_>>(), vec![1, 2, 3]);
        assert_eq!(teams[0].name, "Syrup Storm");
        assert_eq!(teams[1].background.as_deref(), Some("fearsome-flippers-bg.svg"));
        assert_eq!(teams[2].images.as_ref().unwrap().lg, "chaotic-cakers-lg.png");
    }

    #[test]
    fn profile_outputs_are_read_positionally() {
        let profile = TeamProfile::from_outputs(&profile_outputs("Storm", 10, 250, true)).unwrap();
        assert_eq!(
            profile,
            TeamProfile {
                name: "Storm".to_string(),
                users: 10,
                points: 250,
                is_joinable: true,
            }
        );
        assert!(matches!(
            TeamProfile::from_outputs(&profile_outputs("Storm", 1, 1, true)[..4]),
            Err(Error::UnexpectedReturn("getTeamProfile"))
        ));
    }

    #[test]
    fn merge_keeps_static_fields_and_overrides_counters() {
        let teams = teams_list();
        let profile =
            TeamProfile::from_outputs(&profile_outputs("Syrup Storm v2", 7, 42, false)).unwrap();
        let merged = merge_team(teams.first(), 1, profile);

        assert_eq!(merged.name, "Syrup Storm v2");
        assert_eq!(merged.users, 7);
        assert_eq!(merged.points, 42);
        assert_eq!(merged.is_joinable, Some(false));
        assert_eq!(merged.description, teams[0].description);
        assert_eq!(merged.images, teams[0].images);
    }

    #[test]
    fn profile_per_chain() {
        assert_eq!(
            profile_address(4002).unwrap(),
            crate::constants::BERA_SLEEP_PROFILE_FTM_TESTNET
        );
        assert_eq!(profile_address(56).unwrap(), crate::constants::PANCAKE_PROFILE_BSC);
        assert!(matches!(profile_address(1), Err(Error::UnsupportedChain(1))));
    }

    #[test]
    fn merge_without_static_entry_starts_empty() {
        let profile = TeamProfile::from_outputs(&profile_outputs("Newcomers", 1, 0, true)).unwrap();
        let merged = merge_team(None, 4, profile);
        assert_eq!(merged.id, 4);
        assert_eq!(merged.description, "");
        assert!(merged.images.is_none());
    }
}
