use log::{debug, info};
use num_bigint::BigUint;
use num_traits::Zero;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::time::{Duration, Instant};

use crate::core::errors::{WitnessError, WitnessResult};
use crate::core::types::PIETRZAK_LAMBDA;

/// RSA-2048 challenge modulus. Factorization unknown; published by RSA
/// Laboratories, never factored.
const RSA_2048_DECIMAL: &str = "2519590847565789349402718324004839857142928212620403202777713783\
6043662020707595556264018525880784406918290641249515082189298559\
1491761845028084891200728449926873928072877767359714183472702618\
9637501497182469116507761337985909570009733045974880842840179742\
9100642458691817195118746121515172654632282216869987549182422433\
6372590851418654620435767984233871847744479207399342365848238242\
8119816381501067481045166037730605620161967625613384414360383390\
4414952634432190114657544454178424020924616515723350778707749817\
1257724679629263863563732899121548314381678998850404453640235273\
81951378636564391212010397122822120720357";

/// Moduli of unknown factorization the verifier accepts without an
/// explicit opt-in.
fn safe_moduli() -> Vec<BigUint> {
    vec![BigUint::parse_bytes(RSA_2048_DECIMAL.as_bytes(), 10).expect("valid constant")]
}

/// Whether a modulus appears in the recognized safe-modulus table.
pub fn is_recognized_modulus(n: &BigUint) -> bool {
    safe_moduli().iter().any(|m| m == n)
}

/// Parameters for the Pietrzak VDF in an RSA group.
#[derive(Debug, Clone)]
pub struct PietrzakParams {
    pub modulus: BigUint,
    /// Statistical security of the Fiat-Shamir challenges, in bits
    pub lambda: u32,
    /// Accept a modulus outside the recognized table. A modulus with
    /// known factorization lets the prover shortcut the delay, so this
    /// gate must stay opt-in.
    pub allow_untrusted_modulus: bool,
    /// Measured sequential squaring throughput for duration targeting
    pub squarings_per_second: u64,
}

impl PietrzakParams {
    pub fn new(modulus: BigUint) -> WitnessResult<Self> {
        Self::with_options(modulus, PIETRZAK_LAMBDA, false, 10_000)
    }

    pub fn with_options(
        modulus: BigUint,
        lambda: u32,
        allow_untrusted_modulus: bool,
        squarings_per_second: u64,
    ) -> WitnessResult<Self> {
        if modulus.is_zero() {
            return Err(WitnessError::params("modulus must be non-zero"));
        }
        if modulus.bits() < 4 {
            return Err(WitnessError::params("modulus too small"));
        }
        if lambda == 0 || lambda > 256 {
            return Err(WitnessError::params("lambda must be in (0, 256]"));
        }
        if !allow_untrusted_modulus && !is_recognized_modulus(&modulus) {
            return Err(WitnessError::params(
                "modulus is not in the recognized safe-modulus table; \
                 set allow_untrusted_modulus to accept it",
            ));
        }
        Ok(Self {
            modulus,
            lambda,
            allow_untrusted_modulus,
            squarings_per_second: squarings_per_second.max(1),
        })
    }
}

/// Succinct proof that `y = x^(2^t) mod n`.
///
/// Verification takes O(log t) group operations against the recorded
/// halving midpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PietrzakProof {
    #[serde(with = "hex_biguint")]
    pub n: BigUint,
    #[serde(with = "hex_biguint")]
    pub x: BigUint,
    #[serde(with = "hex_biguint")]
    pub y: BigUint,
    pub t: u64,
    pub lambda: u32,
    #[serde(with = "hex_biguint_vec")]
    pub mu: Vec<BigUint>,
}

/// Pietrzak VDF engine bound to one parameter set.
pub struct PietrzakVdf {
    params: PietrzakParams,
}

impl PietrzakVdf {
    pub fn new(params: PietrzakParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &PietrzakParams {
        &self.params
    }

    /// Evaluate the VDF: `t` sequential modular squarings, then record
    /// the halving-protocol midpoints for succinct verification.
    pub fn evaluate(&self, x: &BigUint, t: u64) -> WitnessResult<PietrzakProof> {
        let n = &self.params.modulus;
        if t == 0 {
            return Err(WitnessError::params("T must be positive"));
        }
        check_group_element(x, n)?;

        let started = Instant::now();
        let mut y = x.clone();
        for _ in 0..t {
            y = &y * &y % n;
        }
        debug!(
            "Pietrzak evaluation: {} squarings in {}ms",
            t,
            started.elapsed().as_millis()
        );

        // Halving proof. Each level publishes mu = x_i^(2^ceil(t_i/2));
        // the Fiat-Shamir challenge folds the two half-statements into
        // one of half the time parameter.
        let mut mu_list = Vec::new();
        let mut xi = x.clone();
        let mut yi = y.clone();
        let mut ti = t;
        while ti > 1 {
            let half = ti.div_ceil(2);
            let mut mu = xi.clone();
            for _ in 0..half {
                mu = &mu * &mu % n;
            }
            if ti % 2 == 1 {
                // Odd t: lift the upper half-statement to `half`
                // squarings by squaring its claimed output.
                yi = &yi * &yi % n;
            }
            let r = hash_to_int(n, &xi, &yi, &mu, ti, self.params.lambda);
            xi = xi.modpow(&r, n) * &mu % n;
            yi = mu.modpow(&r, n) * &yi % n;
            mu_list.push(mu);
            ti = half;
        }

        Ok(PietrzakProof {
            n: n.clone(),
            x: x.clone(),
            y,
            t,
            lambda: self.params.lambda,
            mu: mu_list,
        })
    }

    /// Verify a proof in O(log t) modular operations.
    pub fn verify(&self, proof: &PietrzakProof) -> WitnessResult<bool> {
        let n = &self.params.modulus;
        if proof.n != *n {
            return Err(WitnessError::params(
                "proof modulus does not match configured modulus",
            ));
        }
        if proof.t == 0 {
            return Err(WitnessError::params("T must be positive"));
        }
        check_group_element(&proof.x, n)?;
        if proof.y >= *n {
            return Ok(false);
        }

        let mut xi = proof.x.clone();
        let mut yi = proof.y.clone();
        let mut ti = proof.t;
        let mut level = 0usize;
        while ti > 1 {
            let Some(mu) = proof.mu.get(level) else {
                return Ok(false);
            };
            if mu < &BigUint::from(2u32) || mu >= n {
                return Ok(false);
            }
            let half = ti.div_ceil(2);
            if ti % 2 == 1 {
                yi = &yi * &yi % n;
            }
            let r = hash_to_int(n, &xi, &yi, mu, ti, proof.lambda);
            xi = xi.modpow(&r, n) * mu % n;
            yi = mu.modpow(&r, n) * &yi % n;
            ti = half;
            level += 1;
        }
        if level != proof.mu.len() {
            return Ok(false);
        }

        // Base case: one squaring left.
        Ok(&xi * &xi % n == yi)
    }

    /// Lower bound on the real time a proof attests, at the calibrated
    /// squaring rate.
    pub fn min_elapsed_time(&self, proof: &PietrzakProof) -> Duration {
        Duration::from_secs_f64(proof.t as f64 / self.params.squarings_per_second as f64)
    }
}

fn check_group_element(x: &BigUint, n: &BigUint) -> WitnessResult<()> {
    if x < &BigUint::from(2u32) || x >= n {
        return Err(WitnessError::params("input must lie in [2, N)"));
    }
    Ok(())
}

/// Deterministic Fiat-Shamir challenge in [0, 2^lambda) over the level
/// statement.
fn hash_to_int(n: &BigUint, x: &BigUint, y: &BigUint, mu: &BigUint, t: u64, lambda: u32) -> BigUint {
    let mut hasher = Sha256::new();
    hasher.update(b"pietrzak-halving-challenge");
    for value in [n, x, y, mu] {
        let bytes = value.to_bytes_be();
        hasher.update((bytes.len() as u32).to_be_bytes());
        hasher.update(&bytes);
    }
    hasher.update(t.to_be_bytes());
    hasher.update(lambda.to_be_bytes());
    let digest = hasher.finalize();

    let take = (lambda as usize).div_ceil(8).min(digest.len());
    let mut r = BigUint::from_bytes_be(&digest[..take]);
    let excess = (take as u32 * 8).saturating_sub(lambda);
    r >>= excess as usize;
    r
}

/// Measure this machine's sequential modular squaring throughput.
pub fn calibrate_squarings_per_second(
    modulus: &BigUint,
    duration: Duration,
) -> WitnessResult<u64> {
    if duration < Duration::from_millis(crate::core::types::MIN_CALIBRATION_MS) {
        return Err(WitnessError::params("calibration duration too short"));
    }
    if modulus.bits() < 4 {
        return Err(WitnessError::params("modulus too small"));
    }

    let mut x = BigUint::from(3u32) % modulus;
    if x < BigUint::from(2u32) {
        x = BigUint::from(2u32);
    }
    let start = Instant::now();
    let mut count = 0u64;
    while start.elapsed() < duration {
        for _ in 0..64 {
            x = &x * &x % modulus;
        }
        count += 64;
    }
    let rate = ((count as f64 / start.elapsed().as_secs_f64()) as u64).max(1);
    info!("Pietrzak calibration: {} squarings/sec", rate);
    Ok(rate)
}

impl PietrzakProof {
    /// Binary wire encoding: length-prefixed big-endian `N`, `x`, `y`,
    /// then `t` (u64 BE), `lambda` (u32 BE), then a count-prefixed list
    /// of length-prefixed midpoints.
    pub fn encode(&self) -> Vec<u8> {
        let mut buf = Vec::new();
        for value in [&self.n, &self.x, &self.y] {
            put_biguint(&mut buf, value);
        }
        buf.extend_from_slice(&self.t.to_be_bytes());
        buf.extend_from_slice(&self.lambda.to_be_bytes());
        buf.extend_from_slice(&(self.mu.len() as u32).to_be_bytes());
        for value in &self.mu {
            put_biguint(&mut buf, value);
        }
        buf
    }

    /// Decode from wire format, rejecting truncated or size-inconsistent
    /// input.
    pub fn decode(data: &[u8]) -> WitnessResult<PietrzakProof> {
        let mut cursor = Cursor { data, pos: 0 };
        let n = cursor.take_biguint()?;
        let x = cursor.take_biguint()?;
        let y = cursor.take_biguint()?;
        let t = u64::from_be_bytes(cursor.take(8)?.try_into().expect("fixed slice"));
        let lambda = u32::from_be_bytes(cursor.take(4)?.try_into().expect("fixed slice"));
        let count = u32::from_be_bytes(cursor.take(4)?.try_into().expect("fixed slice"));
        let mut mu = Vec::with_capacity(count as usize);
        for _ in 0..count {
            mu.push(cursor.take_biguint()?);
        }
        if cursor.pos != data.len() {
            return Err(WitnessError::decode("trailing bytes after Pietrzak proof"));
        }
        Ok(PietrzakProof {
            n,
            x,
            y,
            t,
            lambda,
            mu,
        })
    }
}

fn put_biguint(buf: &mut Vec<u8>, value: &BigUint) {
    let bytes = value.to_bytes_be();
    buf.extend_from_slice(&(bytes.len() as u32).to_be_bytes());
    buf.extend_from_slice(&bytes);
}

struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    fn take(&mut self, len: usize) -> WitnessResult<&'a [u8]> {
        let end = self
            .pos
            .checked_add(len)
            .filter(|&end| end <= self.data.len())
            .ok_or_else(|| WitnessError::decode("truncated Pietrzak proof"))?;
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn take_biguint(&mut self) -> WitnessResult<BigUint> {
        let len = u32::from_be_bytes(self.take(4)?.try_into().expect("fixed slice")) as usize;
        Ok(BigUint::from_bytes_be(self.take(len)?))
    }
}

mod hex_biguint {
    use super::*;
    use serde::Deserializer;

    pub fn serialize<S: serde::Serializer>(
        value: &BigUint,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&value.to_str_radix(16))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BigUint, D::Error> {
        let s = String::deserialize(deserializer)?;
        BigUint::parse_bytes(s.as_bytes(), 16)
            .ok_or_else(|| serde::de::Error::custom("invalid hex big integer"))
    }
}

mod hex_biguint_vec {
    use super::*;
    use serde::Deserializer;

    pub fn serialize<S: serde::Serializer>(
        values: &[BigUint],
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        let strings: Vec<String> = values.iter().map(|v| v.to_str_radix(16)).collect();
        serde::Serialize::serialize(&strings, serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Vec<BigUint>, D::Error> {
        let strings = Vec::<String>::deserialize(deserializer)?;
        strings
            .iter()
            .map(|s| {
                BigUint::parse_bytes(s.as_bytes(), 16)
                    .ok_or_else(|| serde::de::Error::custom("invalid hex big integer"))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_traits::One;

    // Product of two primes small enough to keep tests fast.
    fn test_modulus() -> BigUint {
        let p = BigUint::from(1_000_003u64);
        let q = BigUint::from(1_000_033u64);
        p * q
    }

    fn test_params(t_rate: u64) -> PietrzakParams {
        PietrzakParams::with_options(test_modulus(), 128, true, t_rate).expect("params")
    }

    #[test]
    fn test_evaluate_and_verify() {
        let vdf = PietrzakVdf::new(test_params(1000));
        let x = BigUint::from(17u32);
        for t in [1u64, 2, 3, 8, 13, 64, 100] {
            let proof = vdf.evaluate(&x, t).expect("evaluate");
            assert!(vdf.verify(&proof).expect("verify"), "t = {t}");
        }
    }

    #[test]
    fn test_proof_is_succinct() {
        let vdf = PietrzakVdf::new(test_params(1000));
        let proof = vdf.evaluate(&BigUint::from(5u32), 1024).expect("evaluate");
        // log2(1024) = 10 halving levels
        assert_eq!(proof.mu.len(), 10);
    }

    #[test]
    fn test_verify_rejects_wrong_output() {
        let vdf = PietrzakVdf::new(test_params(1000));
        let mut proof = vdf.evaluate(&BigUint::from(9u32), 32).expect("evaluate");
        proof.y = (&proof.y + BigUint::one()) % &proof.n;
        assert!(!vdf.verify(&proof).expect("verify"));
    }

    #[test]
    fn test_verify_rejects_tampered_midpoint() {
        let vdf = PietrzakVdf::new(test_params(1000));
        let mut proof = vdf.evaluate(&BigUint::from(11u32), 64).expect("evaluate");
        proof.mu[2] = (&proof.mu[2] + BigUint::one()) % &proof.n;
        assert!(!vdf.verify(&proof).expect("verify"));
    }

    #[test]
    fn test_verify_rejects_out_of_range_midpoint() {
        let vdf = PietrzakVdf::new(test_params(1000));
        let mut proof = vdf.evaluate(&BigUint::from(11u32), 16).expect("evaluate");
        proof.mu[0] = BigUint::one();
        assert!(!vdf.verify(&proof).expect("verify"));
    }

    #[test]
    fn test_verify_rejects_extra_midpoints() {
        let vdf = PietrzakVdf::new(test_params(1000));
        let mut proof = vdf.evaluate(&BigUint::from(7u32), 16).expect("evaluate");
        proof.mu.push(BigUint::from(3u32));
        assert!(!vdf.verify(&proof).expect("verify"));
    }

    #[test]
    fn test_rejects_zero_t() {
        let vdf = PietrzakVdf::new(test_params(1000));
        let err = vdf.evaluate(&BigUint::from(5u32), 0).unwrap_err();
        assert!(matches!(err, WitnessError::Params { .. }));
    }

    #[test]
    fn test_rejects_input_out_of_group() {
        let vdf = PietrzakVdf::new(test_params(1000));
        assert!(vdf.evaluate(&BigUint::one(), 4).is_err());
        assert!(vdf.evaluate(&test_modulus(), 4).is_err());
    }

    #[test]
    fn test_untrusted_modulus_requires_opt_in() {
        let err = PietrzakParams::new(test_modulus()).unwrap_err();
        assert!(matches!(err, WitnessError::Params { .. }));
        assert!(
            PietrzakParams::with_options(test_modulus(), 128, true, 1000).is_ok()
        );
    }

    #[test]
    fn test_recognized_modulus_accepted_without_opt_in() {
        let rsa2048 = BigUint::parse_bytes(RSA_2048_DECIMAL.as_bytes(), 10).expect("parse");
        assert_eq!(rsa2048.bits(), 2048);
        assert!(is_recognized_modulus(&rsa2048));
        assert!(PietrzakParams::new(rsa2048).is_ok());
    }

    #[test]
    fn test_wire_roundtrip() {
        let vdf = PietrzakVdf::new(test_params(1000));
        let proof = vdf.evaluate(&BigUint::from(23u32), 50).expect("evaluate");
        let encoded = proof.encode();
        let decoded = PietrzakProof::decode(&encoded).expect("decode");
        assert_eq!(decoded, proof);
        assert!(vdf.verify(&decoded).expect("verify"));
    }

    #[test]
    fn test_wire_rejects_truncation() {
        let vdf = PietrzakVdf::new(test_params(1000));
        let proof = vdf.evaluate(&BigUint::from(23u32), 8).expect("evaluate");
        let encoded = proof.encode();
        for cut in [0, 3, encoded.len() / 2, encoded.len() - 1] {
            assert!(PietrzakProof::decode(&encoded[..cut]).is_err(), "cut {cut}");
        }
    }

    #[test]
    fn test_wire_rejects_trailing_bytes() {
        let vdf = PietrzakVdf::new(test_params(1000));
        let proof = vdf.evaluate(&BigUint::from(23u32), 8).expect("evaluate");
        let mut encoded = proof.encode();
        encoded.push(0);
        assert!(PietrzakProof::decode(&encoded).is_err());
    }

    #[test]
    fn test_min_elapsed_time_uses_rate() {
        let vdf = PietrzakVdf::new(test_params(500));
        let proof = vdf.evaluate(&BigUint::from(3u32), 250).expect("evaluate");
        assert_eq!(vdf.min_elapsed_time(&proof), Duration::from_millis(500));
    }

    #[test]
    fn test_calibration() {
        let rate = calibrate_squarings_per_second(&test_modulus(), Duration::from_millis(110))
            .expect("calibrate");
        assert!(rate > 0);
        assert!(
            calibrate_squarings_per_second(&test_modulus(), Duration::from_millis(10)).is_err()
        );
    }
}
