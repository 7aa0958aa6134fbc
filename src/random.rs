//! Named, independently seeded random streams stored in the `Context`.
//!
//! Each stream is declared with `define_rng!` and is seeded from the base
//! seed given to `init_random` plus a hash of the stream's name, so adding
//! draws to one stream never perturbs another.
use std::any::{Any, TypeId};
use std::cell::{RefCell, RefMut};

use rand::distr::uniform::{SampleRange, SampleUniform};
use rand::{Rng, SeedableRng};
use rand_distr::Distribution;

use crate::context::Context;
use crate::hashing::hash_str;
use crate::log::trace;
use crate::{define_data_plugin, HashMap, HashMapExt};

/// Declares a named random stream. The stream's name also feeds its seed,
/// so two streams cannot share a name.
#[macro_export]
macro_rules! define_rng {
    ($random_id:ident) => {
        #[derive(Copy, Clone)]
        struct $random_id;

        impl $crate::random::RngId for $random_id {
            type RngType = $crate::rand::rngs::StdRng;

            fn get_name() -> &'static str {
                stringify!($random_id)
            }
        }

        // A second stream with this name fails to link.
        $crate::paste::paste! {
            #[doc(hidden)]
            #[no_mangle]
            #[allow(non_upper_case_globals)]
            pub static [<episim_rng_name_ $random_id>]: () = ();
        }
    };
}
pub use define_rng;

pub trait RngId: Copy + Clone + Any {
    type RngType: SeedableRng;
    fn get_name() -> &'static str;
}

struct RngData {
    base_seed: Option<u64>,
    // Boxed `R::RngType` per stream, created on first draw.
    streams: RefCell<HashMap<TypeId, Box<dyn Any>>>,
}

define_data_plugin!(
    RngPlugin,
    RngData,
    RngData {
        base_seed: None,
        streams: RefCell::new(HashMap::new()),
    }
);

const UNSEEDED: &str = "You must initialize the random number generator with a base seed";

fn stream<R: RngId>(context: &Context) -> RefMut<'_, R::RngType> {
    let data = context.get_data_container(RngPlugin).expect(UNSEEDED);
    let base_seed = data.base_seed.expect(UNSEEDED);

    RefMut::map(data.streams.borrow_mut(), |streams| {
        streams
            .entry(TypeId::of::<R>())
            .or_insert_with(|| {
                let seed = base_seed.wrapping_add(hash_str(R::get_name()));
                trace!("seeding stream {} with {seed}", R::get_name());
                let rng: Box<dyn Any> = Box::new(R::RngType::seed_from_u64(seed));
                rng
            })
            .downcast_mut::<R::RngType>()
            .expect("stream stored under the wrong type")
    })
}

pub trait ContextRandomExt {
    /// Sets the base seed and discards every stream drawn from so far.
    fn init_random(&mut self, base_seed: u64);

    /// Runs `sampler` against the stream `R`.
    ///
    /// # Panics
    ///
    /// Panics if `init_random` has not been called.
    fn sample<R: RngId, T>(&self, rng_id: R, sampler: impl FnOnce(&mut R::RngType) -> T) -> T;

    fn sample_distr<R: RngId, T>(&self, rng_id: R, distribution: impl Distribution<T>) -> T
    where
        R::RngType: Rng;

    /// Uniform draw from `range`.
    fn sample_range<R: RngId, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform;

    /// Bernoulli trial with success probability `p`.
    fn sample_bool<R: RngId>(&self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng;
}

impl ContextRandomExt for Context {
    fn init_random(&mut self, base_seed: u64) {
        trace!("base seed set to {base_seed}");
        let data = self.get_data_container_mut(RngPlugin);
        data.base_seed = Some(base_seed);
        data.streams.get_mut().clear();
    }

    fn sample<R: RngId, T>(&self, _rng_id: R, sampler: impl FnOnce(&mut R::RngType) -> T) -> T {
        sampler(&mut stream::<R>(self))
    }

    fn sample_distr<R: RngId, T>(&self, rng_id: R, distribution: impl Distribution<T>) -> T
    where
        R::RngType: Rng,
    {
        self.sample(rng_id, |rng| distribution.sample(rng))
    }

    fn sample_range<R: RngId, S, T>(&self, rng_id: R, range: S) -> T
    where
        R::RngType: Rng,
        S: SampleRange<T>,
        T: SampleUniform,
    {
        self.sample(rng_id, |rng| rng.random_range(range))
    }

    fn sample_bool<R: RngId>(&self, rng_id: R, p: f64) -> bool
    where
        R::RngType: Rng,
    {
        self.sample(rng_id, |rng| rng.random_bool(p))
    }
}
