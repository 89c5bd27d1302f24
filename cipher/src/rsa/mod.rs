//! RSA
//!
//! - 随机选择两个质数$p$和$q$($p\neq q$), 则模数$n=p*q$. 模数的字节长度$k$满足: $2^{((k-1)*8}\le n \lt 2^{k*8}$;
//! - 公钥指数固定为$e=65537$, 满足和$p-1$及$q-1$都是互质关系;
//! - 那么私钥的指数部分$d$满足: $d*e-1$能被$q-1$和$p-1$整除;
//!
//! 加密: $y = x ^ e \mod n$;
//!
//! 解密: $y = x^d \mod n$;
//!
//! 原理: 欧拉定理$a^{\phi(n)} \equiv 1 \mod n$
//! - $x ^ {k(p-1)(q-1)+1} \equiv x \mod n$
//!

mod key;
pub use key::{PrivateKey, PublicKey, PUBLIC_EXPONENT};

mod pkcs1;
pub use pkcs1::{PKCS1Decrypt, PKCS1Encrypt};
