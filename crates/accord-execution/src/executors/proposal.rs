//! Proposals, votes and batch execution

use super::name::is_name_char;
use super::{Context, Executor};
use crate::error::{Exception, ExecutionError, ExecutionResult};
use crate::execution::TxExecution;
use crate::ledger::LedgerCache;
use crate::permissions::has_permission;
use crate::shared::prepare_inputs;
use crate::validators::ValidatorSet;
use accord_primitives::{Address, H256};
use accord_storage::{RegistryReader, RegistryWriter, StateReader, StateWriter};
use accord_types::{Ballot, PermFlag, Proposal, ProposalState, ProposalTx};
use std::collections::BTreeMap;
use std::slice;

/// Executes [`ProposalTx`]
#[derive(Debug, Default, Clone, Copy)]
pub struct ProposalExecutor;

impl Executor<ProposalTx> for ProposalExecutor {
    fn execute(&self, ctx: &Context<'_>, txe: &mut TxExecution, tx: &ProposalTx) -> ExecutionResult<()> {
        let voter = prepare_inputs(ctx, slice::from_ref(&tx.input), PermFlag::PROPOSAL)?.remove(0);
        let voter_address = voter.address;
        ctx.ledger.state.update_account(voter)?;

        let (hash, mut ballot) = resolve_ballot(ctx, tx)?;
        if ballot.state.is_final() {
            return Err(ExecutionError::ProposalExecuted(hash));
        }
        validate_batch(ctx, &ballot.proposal)?;

        ballot.vote(voter_address, tx.voting_weight);
        txe.input(voter_address);

        let votes = ballot.positive_votes();
        let validators = ctx.ledger.validators.validator_count()?;
        tracing::debug!(proposal = %hash, voter = %voter_address, votes, validators, "vote registered");

        if ctx.params.proposal_passes(votes, validators) {
            ballot.state = run_batch(ctx, txe, &ballot.proposal)?;
            tracing::info!(proposal = %hash, state = ?ballot.state, "proposal finished");
        }
        ctx.ledger.proposals.update(hash, ballot)?;
        Ok(())
    }
}

/// The ballot addressed by `tx`, fetched or freshly created
fn resolve_ballot(ctx: &Context<'_>, tx: &ProposalTx) -> ExecutionResult<(H256, Ballot)> {
    let proposed = tx.proposal.as_ref().map(|p| (p.hash(), p));
    let hash = match (tx.proposal_hash, &proposed) {
        (Some(hash), Some((computed, _))) if hash != *computed => {
            return Err(ExecutionError::InvalidProposal(format!(
                "proposal hash {} does not match proposal {}",
                hash, computed
            )));
        }
        (Some(hash), _) => hash,
        (None, Some((computed, _))) => *computed,
        (None, None) => {
            return Err(ExecutionError::InvalidProposal(
                "neither a proposal nor a proposal hash given".into(),
            ))
        }
    };

    match (ctx.ledger.proposals.get(&hash)?, proposed) {
        (Some(ballot), _) => Ok((hash, ballot)),
        (None, Some((_, proposal))) => {
            validate_proposal_strings(proposal)?;
            Ok((hash, Ballot::new(proposal.clone())))
        }
        (None, None) => Err(ExecutionError::InvalidProposal(format!("unknown proposal {}", hash))),
    }
}

/// Name from the name-registry charset, description printable
fn validate_proposal_strings(proposal: &Proposal) -> ExecutionResult<()> {
    if proposal.name.is_empty() {
        return Err(ExecutionError::InvalidString("proposal name must not be empty".into()));
    }
    if !proposal.name.chars().all(is_name_char) {
        return Err(ExecutionError::InvalidString(format!(
            "invalid characters in proposal name {:?}",
            proposal.name
        )));
    }
    if !proposal.description.chars().all(is_printable) {
        return Err(ExecutionError::InvalidString(
            "proposal description must be printable".into(),
        ));
    }
    Ok(())
}

/// Graphic characters and the plain space
fn is_printable(c: char) -> bool {
    c == ' ' || !(c.is_control() || c.is_whitespace())
}

/// Every batch input must exist, hold Batch and carry the next sequence,
/// counting earlier steps of the same batch.
fn validate_batch(ctx: &Context<'_>, proposal: &Proposal) -> ExecutionResult<()> {
    if proposal.batch.txs.is_empty() {
        return Err(ExecutionError::InvalidProposal("empty batch".into()));
    }
    let mut expected: BTreeMap<Address, u64> = BTreeMap::new();
    for step in &proposal.batch.txs {
        for input in step.inputs() {
            let next = match expected.get(&input.address) {
                Some(next) => *next,
                None => {
                    let account = ctx.ledger.state.get_account(&input.address)?.ok_or_else(|| {
                        ExecutionError::InvalidProposal(format!("batch input {} does not exist", input.address))
                    })?;
                    if !has_permission(&account, &ctx.global, PermFlag::BATCH) {
                        return Err(ExecutionError::PermissionDenied {
                            address: input.address,
                            permission: PermFlag::BATCH,
                        });
                    }
                    account.sequence.checked_add(1).ok_or(ExecutionError::IntegerOverflow)?
                }
            };
            if input.sequence != next {
                return Err(ExecutionError::ExpiredProposal(format!(
                    "batch input {} has sequence {}, account expects {}",
                    input.address, input.sequence, next
                )));
            }
            expected.insert(input.address, next.saturating_add(1));
        }
    }
    Ok(())
}

/// Run every step in one generation; commit it only if all steps succeed
fn run_batch(ctx: &Context<'_>, txe: &mut TxExecution, proposal: &Proposal) -> ExecutionResult<ProposalState> {
    let batch = LedgerCache::new(ctx.ledger.readers()).named("batch");
    for (index, step) in proposal.batch.txs.iter().enumerate() {
        match ctx.dispatcher.dispatch(&batch, step) {
            Ok(execution) => txe.executions.push(execution),
            Err(err) => {
                tracing::info!(step = index, error = %err, "batch step failed");
                txe.push_error(Exception::from(&err));
                return Ok(ProposalState::Failed);
            }
        }
    }
    batch.sync(ctx.ledger.writers())?;
    Ok(ProposalState::Executed)
}
