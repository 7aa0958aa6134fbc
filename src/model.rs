//! Assembles a runnable simulation from `Parameters`.
use crate::census::ContextCensusExt;
use crate::context::Context;
use crate::disease::ContextDiseaseExt;
use crate::error::SimError;
use crate::generator::generate_population;
use crate::parameters::{ContextParametersExt, Parameters};
use crate::places::ContextPlacesExt;
use crate::roles::ContextRolesExt;
use crate::{debug, info};

/// Builds the model described by the parameters stored in the context:
/// disease rules, place kinds, roles and the population, followed by the
/// census and the end of the simulation. The random module must already
/// be initialized.
///
/// # Errors
///
/// Returns `SimError::Validation` if no parameters have been set or a role
/// cannot be registered.
pub fn init(context: &mut Context) -> Result<(), SimError> {
    let parameters = context
        .get_parameters()
        .cloned()
        .ok_or_else(|| SimError::Validation(vec!["no parameters have been set".to_string()]))?;

    context.set_disease_rules(parameters.disease.to_rules());
    for kind in &parameters.place_kinds {
        context.add_place_kind(kind.to_place_kind());
    }
    for role in &parameters.roles {
        let role = parameters.build_role(role)?;
        context.add_role(role)?;
    }
    debug!(
        "{} place kinds and {} roles registered",
        context.get_place_kind_count(),
        context.get_role_count()
    );

    generate_population(context, parameters.population, parameters.initial_infected);

    let end_time = parameters.end_time_hours();
    context.start_census(end_time);
    context.shutdown_at(end_time);
    info!("model ready; running until t={end_time}");
    Ok(())
}

/// Validates and stores `parameters`, then builds the model.
///
/// # Errors
///
/// Returns `SimError::Validation` if the parameters are invalid.
pub fn init_with_parameters(context: &mut Context, parameters: Parameters) -> Result<(), SimError> {
    context.set_parameters(parameters)?;
    init(context)
}
