//! Iterator macros that switch between rayon and the serial std iterators
//! depending on the `parallel` feature. Modules using them import
//! `rayon::prelude::*` under the same feature gate.

macro_rules! par_iter {
    ($t: expr) => {{
        #[cfg(not(feature = "parallel"))]
        let it = $t.iter();

        #[cfg(feature = "parallel")]
        let it = $t.par_iter();
        it
    }};
}

macro_rules! par_iter_mut {
    ($t: expr) => {{
        #[cfg(not(feature = "parallel"))]
        let it = $t.iter_mut();

        #[cfg(feature = "parallel")]
        let it = $t.par_iter_mut();
        it
    }};
}

macro_rules! par_range {
    ($r: expr) => {{
        #[cfg(not(feature = "parallel"))]
        let it = $r.into_iter();

        #[cfg(feature = "parallel")]
        let it = $r.into_par_iter();
        it
    }};
}
